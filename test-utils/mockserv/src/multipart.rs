//! `multipart/form-data` upload bodies, read with `multer`.

use hyper::body::Bytes;
use std::convert::Infallible;

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub filename: String,
    pub data: Bytes,
}

/// Extract the boundary parameter from a `Content-Type` value, if it is
/// multipart.
pub fn boundary(content_type: &str) -> Option<String> {
    multer::parse_boundary(content_type).ok()
}

/// Parts that carry a filename. Fields without one are skipped.
pub async fn file_parts(body: Bytes, boundary: &str) -> Result<Vec<FilePart>, String> {
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    let mut parts = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if filename.is_empty() || filename.contains('/') || filename == ".." {
            return Err(format!("unacceptable filename '{}'", filename));
        }
        let data = field.bytes().await.map_err(|e| e.to_string())?;
        parts.push(FilePart { filename, data });
    }

    Ok(parts)
}
