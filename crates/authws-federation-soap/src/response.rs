//! SOAP response decoding.
//!
//! The body is converted to a [`RemoteValue`] tree keyed by local element
//! names. Elements with children become structures, repeated siblings
//! become lists, leaves become text and `xsi:nil` elements become null.

use std::collections::BTreeMap;

use authws_federation::RemoteValue;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{SoapError, SoapResult};

/// An element being read.
struct Frame {
    name: String,
    nil: bool,
    text: String,
    children: Option<RemoteValue>,
}

impl Frame {
    fn open(element: &BytesStart<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(element.local_name().into_inner()).to_string(),
            nil: is_nil(element),
            text: String::new(),
            children: None,
        }
    }

    fn close(self) -> (String, RemoteValue) {
        let value = if self.nil {
            RemoteValue::Null
        } else if let Some(children) = self.children {
            children
        } else {
            RemoteValue::Text(self.text)
        };
        (self.name, value)
    }

    fn add_child(&mut self, name: String, value: RemoteValue) {
        self.children
            .get_or_insert_with(|| RemoteValue::Struct(BTreeMap::new()))
            .push_child(name, value);
    }
}

fn is_nil(element: &BytesStart<'_>) -> bool {
    element.attributes().flatten().any(|attr| {
        attr.key.local_name().into_inner() == b"nil"
            && matches!(attr.value.as_ref(), b"true" | b"1")
    })
}

/// Reads an XML document into a single named root value.
fn read_document(xml: &str) -> SoapResult<(String, RemoteValue)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;

    loop {
        let closed = match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(Frame::open(&e));
                None
            }
            Ok(Event::Empty(e)) => {
                let frame = Frame::open(&e);
                Some(frame.close())
            }
            Ok(Event::Text(e)) => {
                if let Some(frame) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| SoapError::Xml(err.to_string()))?;
                    frame.text.push_str(&text);
                }
                None
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e));
                }
                None
            }
            Ok(Event::End(_)) => stack.pop().map(Frame::close),
            Ok(Event::Eof) => break,
            Err(e) => return Err(SoapError::Xml(e.to_string())),
            _ => None,
        };

        if let Some((name, value)) = closed {
            match stack.last_mut() {
                Some(parent) => parent.add_child(name, value),
                None => root = Some((name, value)),
            }
        }
    }

    if !stack.is_empty() {
        return Err(SoapError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| SoapError::Xml("empty document".to_string()))
}

fn fault_text(fault: &RemoteValue, soap11: &str, soap12: &[&str]) -> String {
    fault
        .get(soap11)
        .or_else(|| fault.path(soap12))
        .and_then(RemoteValue::as_text)
        .unwrap_or_default()
        .to_string()
}

/// Decodes the response of an operation call.
///
/// Returns the `<operation>Response` element (or the only body element)
/// as a structure. A `Fault` element becomes [`SoapError::Fault`].
pub fn parse_response(xml: &str, operation: &str) -> SoapResult<RemoteValue> {
    let (root, envelope) = read_document(xml)?;
    if root != "Envelope" {
        return Err(SoapError::Xml(format!("expected Envelope, found {root}")));
    }
    let body = envelope.get("Body").ok_or(SoapError::MissingBody)?;

    if let Some(fault) = body.get("Fault") {
        return Err(SoapError::Fault {
            code: fault_text(fault, "faultcode", &["Code", "Value"]),
            message: fault_text(fault, "faultstring", &["Reason", "Text"]),
        });
    }

    if let Some(response) = body.get(&format!("{operation}Response")) {
        return Ok(response.clone());
    }
    match body {
        RemoteValue::Struct(children) if children.len() == 1 => {
            Ok(children.values().next().cloned().unwrap_or_default())
        }
        _ => Err(SoapError::MissingBody),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
            <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"
                           xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
              <soap:Body>{body}</soap:Body>
            </soap:Envelope>"#
        )
    }

    #[test]
    fn parses_student_list() {
        let xml = envelope(
            r#"<GetAlunosResponse xmlns="http://tempuri.org/">
                 <GetAlunosResult>
                   <wsAluno>
                     <Codigo>10</Codigo>
                     <LoginPortal>asilva</LoginPortal>
                     <Nome>Ana Silva</Nome>
                     <Email>ana@example.edu</Email>
                   </wsAluno>
                   <wsAluno>
                     <Codigo>11</Codigo>
                     <LoginPortal>bsouza</LoginPortal>
                     <Nome>Bruno &amp; Souza</Nome>
                     <Email xsi:nil="true" />
                   </wsAluno>
                 </GetAlunosResult>
               </GetAlunosResponse>"#,
        );

        let value = parse_response(&xml, "GetAlunos").unwrap();

        let students = value.path(&["GetAlunosResult", "wsAluno"]).unwrap().items();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].get("LoginPortal").and_then(RemoteValue::as_text), Some("asilva"));
        assert_eq!(students[1].get("Nome").and_then(RemoteValue::as_text), Some("Bruno & Souza"));
        assert!(students[1].get("Email").unwrap().is_null());
    }

    #[test]
    fn single_record_is_not_a_list() {
        let xml = envelope(
            r"<GetAlunosResponse><GetAlunosResult><wsAluno><Codigo>10</Codigo></wsAluno></GetAlunosResult></GetAlunosResponse>",
        );

        let value = parse_response(&xml, "GetAlunos").unwrap();
        let student = value.path(&["GetAlunosResult", "wsAluno"]).unwrap();

        assert!(matches!(student, RemoteValue::Struct(_)));
        assert_eq!(student.items().len(), 1);
    }

    #[test]
    fn empty_element_is_empty_text() {
        let xml = envelope(
            r"<ValidarLoginResponse><ValidarLoginResult><Sucesso>true</Sucesso><Mensagem/></ValidarLoginResult></ValidarLoginResponse>",
        );

        let value = parse_response(&xml, "ValidarLogin").unwrap();

        assert!(value
            .path(&["ValidarLoginResult", "Sucesso"])
            .is_some_and(RemoteValue::is_truthy));
        assert_eq!(
            value.path(&["ValidarLoginResult", "Mensagem"]),
            Some(&RemoteValue::text(""))
        );
    }

    #[test]
    fn soap11_fault() {
        let xml = envelope(
            r"<soap:Fault><faultcode>soap:Server</faultcode><faultstring>Chave invalida</faultstring></soap:Fault>",
        );

        let err = parse_response(&xml, "GetAlunos").unwrap_err();

        match err {
            SoapError::Fault { code, message } => {
                assert_eq!(code, "soap:Server");
                assert_eq!(message, "Chave invalida");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn soap12_fault() {
        let xml = envelope(
            r"<soap:Fault><soap:Code><soap:Value>soap:Receiver</soap:Value></soap:Code><soap:Reason><soap:Text>down</soap:Text></soap:Reason></soap:Fault>",
        );

        let err = parse_response(&xml, "GetAlunos").unwrap_err();

        assert!(matches!(err, SoapError::Fault { ref code, ref message }
            if code == "soap:Receiver" && message == "down"));
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            parse_response("<soap:Envelope><soap:Body>", "GetAlunos"),
            Err(SoapError::Xml(_))
        ));
        assert!(matches!(
            parse_response("<html><body>gateway</body></html>", "GetAlunos"),
            Err(SoapError::Xml(_))
        ));
        assert!(matches!(
            parse_response(&envelope(""), "GetAlunos"),
            Err(SoapError::MissingBody)
        ));
    }
}
