//! SOAP 1.1 request envelopes.

use std::fmt::Write as _;

use authws_federation::RequestParams;
use quick_xml::escape::escape;

use crate::error::{SoapError, SoapResult};

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
    r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
    r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
    "<soap:Body>"
);

const ENVELOPE_CLOSE: &str = "</soap:Body></soap:Envelope>";

/// Checks that a string can be used as an element name.
fn validate_name(kind: &str, name: &str) -> SoapResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(SoapError::config(format!("invalid {kind} name '{name}'")))
    }
}

/// Builds the request envelope of an operation call.
///
/// Each parameter becomes a child element of the operation element, in
/// order. Values are XML-escaped.
pub fn build_request(namespace: &str, operation: &str, params: &RequestParams) -> SoapResult<String> {
    validate_name("operation", operation)?;

    let mut xml = String::with_capacity(512);
    xml.push_str(ENVELOPE_OPEN);
    let _ = write!(xml, r#"<{operation} xmlns="{}">"#, escape(namespace));
    for (name, value) in params.iter() {
        validate_name("parameter", name)?;
        let _ = write!(xml, "<{name}>{}</{name}>", escape(value));
    }
    let _ = write!(xml, "</{operation}>");
    xml.push_str(ENVELOPE_CLOSE);
    Ok(xml)
}
