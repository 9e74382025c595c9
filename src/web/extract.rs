//! Form body extractor accepting urlencoded and multipart submissions.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form,
};

use crate::forms::{FormData, UploadedFile};
use crate::web::error::WebError;

/// A submitted form, whichever encoding the browser used.
#[derive(Debug)]
pub struct FormBody(pub FormData);

impl<S: Send + Sync> FromRequest<S> for FormBody {
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| WebError::BadRequest(e.body_text()))?;
            return Ok(FormBody(FormData::from_pairs(pairs)));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| WebError::BadRequest(e.body_text()))?;
        let mut data = FormData::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| WebError::BadRequest(format!("Failed to read multipart: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| WebError::BadRequest(format!("Failed to read file: {}", e)))?;
                    data.insert_file(
                        name,
                        UploadedFile {
                            filename,
                            data: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| WebError::BadRequest(format!("Failed to read field: {}", e)))?;
                    data.insert_field(name, value);
                }
            }
        }

        Ok(FormBody(data))
    }
}
