//! `multipart/form-data` encoding.
//!
//! Every field and every uploaded file becomes one part:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{name}"[; filename="{file}"]\r\n
//! [Content-Length: {n}\r\n]
//! \r\n
//! {data}\r\n
//! ```
//!
//! Lists become repeated `name[]` parts. No closing `--{boundary}--` line is written.

use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;
use tracing::trace;
use uuid::Uuid;

use super::form::{kind_name, scalar_to_string};
use super::{BodyContext, FieldValue, Payload};
use crate::MessageError;
use crate::upload::{UploadedFile, UploadedFileEntry};

/// Derives a 32 hex character boundary from the request content.
///
/// The boundary is a name-based (v5) uuid over the method, target, payload and file
/// descriptors, so the same request gives the same boundary across builds and releases.
///
/// # Errors
///
/// - [`MessageError::Encoding`] if the payload can't be serialized
pub(crate) fn boundary(ctx: &BodyContext<'_>) -> Result<String, MessageError> {
    let payload = serde_json::to_string(ctx.payload)
        .map_err(|e| MessageError::encoding(format!("multipart boundary could not be derived: {e}")))?;

    let mut descriptors = Vec::new();
    for (name, entry) in ctx.files {
        describe(name, entry, &mut descriptors);
    }

    let mut name = Vec::with_capacity(payload.len() + ctx.request_target.len() + 16);
    for part in [ctx.method.as_str(), ctx.request_target, payload.as_str()].into_iter().chain(descriptors.iter().map(String::as_str)) {
        name.extend_from_slice(part.as_bytes());
        name.push(0);
    }

    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, &name).simple().to_string())
}

fn describe(name: &str, entry: &UploadedFileEntry, out: &mut Vec<String>) {
    match entry {
        UploadedFileEntry::Single(file) => out.push(format!("{name}:{}:{:?}", file.client_filename().unwrap_or_default(), file.size())),
        UploadedFileEntry::List(entries) => entries.iter().for_each(|entry| describe(name, entry, out)),
    }
}

/// Serializes the payload fields, then the uploaded files, under `boundary`.
///
/// # Errors
///
/// - [`MessageError::UnexpectedBody`] if the payload is not a field list, object or array, or
///   if nothing at all was serialized
/// - [`MessageError::InvalidUploadFile`] if a file slot holds a nested list
/// - errors from reading an uploaded file's stream
pub(crate) fn encode(ctx: &BodyContext<'_>, boundary: &str) -> Result<Bytes, MessageError> {
    let mut content = BytesMut::new();

    match ctx.payload {
        Payload::Empty | Payload::Structured(Value::Null) => {}
        Payload::Text(text) if text.is_empty() => {}
        Payload::Fields(fields) => {
            for (name, value) in fields {
                match value {
                    FieldValue::Text(text) => write_field(&mut content, boundary, name, text),
                    FieldValue::List(values) => values.iter().for_each(|value| write_field(&mut content, boundary, &format!("{name}[]"), value)),
                }
            }
        }
        Payload::Structured(Value::Object(map)) => {
            for (name, value) in map {
                write_value(&mut content, boundary, name, value)?;
            }
        }
        Payload::Structured(Value::Array(values)) => {
            for (i, value) in values.iter().enumerate() {
                write_value(&mut content, boundary, &i.to_string(), value)?;
            }
        }
        other => {
            return Err(MessageError::unexpected_body(format!("content must be a field list, an object or an array, given {}", kind_name(other))));
        }
    }

    for (name, entry) in ctx.files {
        match entry {
            UploadedFileEntry::Single(file) => write_file(&mut content, boundary, name, file)?,
            UploadedFileEntry::List(entries) => {
                let list_name = format!("{name}[]");
                for entry in entries {
                    let UploadedFileEntry::Single(file) = entry else {
                        return Err(MessageError::invalid_upload_file(format!("expected an uploaded file in {list_name}, found a nested list")));
                    };
                    write_file(&mut content, boundary, &list_name, file)?;
                }
            }
        }
    }

    if content.is_empty() {
        return Err(MessageError::unexpected_body("content must include either a body or uploaded files"));
    }

    trace!(size = content.len(), boundary, "encoded multipart body");
    Ok(content.freeze())
}

fn write_value(content: &mut BytesMut, boundary: &str, name: &str, value: &Value) -> Result<(), MessageError> {
    match value {
        Value::Array(values) => values.iter().try_for_each(|value| write_list_item(content, boundary, name, value)),
        Value::Object(map) => map.values().try_for_each(|value| write_list_item(content, boundary, name, value)),
        scalar => {
            write_field(content, boundary, name, &scalar_to_string(scalar));
            Ok(())
        }
    }
}

fn write_list_item(content: &mut BytesMut, boundary: &str, name: &str, value: &Value) -> Result<(), MessageError> {
    if matches!(value, Value::Array(_) | Value::Object(_)) {
        return Err(MessageError::unexpected_body(format!("multipart field {name} must hold scalars or a list of scalars")));
    }
    write_field(content, boundary, &format!("{name}[]"), &scalar_to_string(value));
    Ok(())
}

fn write_field(content: &mut BytesMut, boundary: &str, name: &str, value: &str) {
    write_part_head(content, boundary, name, None, None);
    content.put_slice(value.as_bytes());
    content.put_slice(b"\r\n");
}

fn write_file(content: &mut BytesMut, boundary: &str, name: &str, file: &UploadedFile) -> Result<(), MessageError> {
    let stream = file.stream()?;
    let data = stream.to_bytes()?;
    let size = stream.size().unwrap_or(data.len() as u64);

    let file_name = file
        .client_filename()
        .map(|name| Path::new(name).file_name().map_or_else(|| name.to_string(), |base| base.to_string_lossy().into_owned()))
        .unwrap_or_default();

    write_part_head(content, boundary, name, Some(&file_name), Some(size));
    content.put_slice(&data);
    content.put_slice(b"\r\n");
    Ok(())
}

fn write_part_head(content: &mut BytesMut, boundary: &str, name: &str, file_name: Option<&str>, size: Option<u64>) {
    content.put_slice(b"--");
    content.put_slice(boundary.as_bytes());
    content.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
    content.put_slice(name.as_bytes());
    content.put_u8(b'"');
    if let Some(file_name) = file_name {
        content.put_slice(b"; filename=\"");
        content.put_slice(file_name.as_bytes());
        content.put_u8(b'"');
    }
    content.put_slice(b"\r\n");
    if let Some(size) = size {
        content.put_slice(format!("Content-Length: {size}\r\n").as_bytes());
    }
    content.put_slice(b"\r\n");
}
