//! SOAP 1.1 envelopes for services that carry a `SecuTokenWS` header and
//! return their payload as text inside `<{Operation}Result>`.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::reader::Reader;

use crate::error::{Result, ToolError};

pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const TEMPURI_NS: &str = "http://tempuri.org/";

const PLACEHOLDER: &str = "?";

/// Contents of the `tem:SecuTokenWS` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHeader {
    pub user_name: String,
    pub password: String,
    pub token: String,
}

impl SecurityHeader {
    /// Header used for the login call: real credentials, no token yet.
    pub fn credentials(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            token: PLACEHOLDER.to_string(),
        }
    }

    /// Header used once a session token has been issued.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            user_name: PLACEHOLDER.to_string(),
            password: PLACEHOLDER.to_string(),
            token: token.into(),
        }
    }
}

/// Builds the envelope for `operation` with its parameters in order.
pub fn envelope(header: &SecurityHeader, operation: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(soap_error)?;

    writer
        .create_element("soapenv:Envelope")
        .with_attribute(("xmlns:soapenv", SOAP_ENVELOPE_NS))
        .with_attribute(("xmlns:tem", TEMPURI_NS))
        .write_inner_content(|w| {
            w.create_element("soapenv:Header").write_inner_content(|w| {
                w.create_element("tem:SecuTokenWS").write_inner_content(|w| {
                    text_element(w, "tem:UserName", &header.user_name)?;
                    text_element(w, "tem:Password", &header.password)?;
                    text_element(w, "tem:AuthenticationToken", &header.token)?;
                    Ok(())
                })?;
                Ok(())
            })?;
            w.create_element("soapenv:Body").write_inner_content(|w| {
                let call = w.create_element(format!("tem:{operation}"));
                if params.is_empty() {
                    call.write_empty()?;
                } else {
                    call.write_inner_content(|w| {
                        for (name, value) in params {
                            text_element(w, &format!("tem:{name}"), value)?;
                        }
                        Ok(())
                    })?;
                }
                Ok(())
            })?;
            Ok(())
        })
        .map_err(soap_error)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(soap_error)
}

fn text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    value: &str,
) -> std::io::Result<()> {
    writer
        .create_element(name.to_string())
        .write_text_content(BytesText::new(value))?;
    Ok(())
}

/// Extracts the unescaped text of `<{operation}Result>` from a response.
pub fn operation_result(xml: &str, operation: &str) -> Result<String> {
    let target = format!("{operation}Result");
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event().map_err(soap_error)? {
            Event::Start(start) if start.local_name().as_ref() == target.as_bytes() => {
                let end = start.to_end().into_owned();
                let raw = reader.read_text(end.name()).map_err(soap_error)?;
                let text = unescape(&raw).map_err(soap_error)?;
                return Ok(text.into_owned());
            }
            Event::Empty(empty) if empty.local_name().as_ref() == target.as_bytes() => {
                return Ok(String::new());
            }
            Event::Eof => {
                return Err(ToolError::Soap(format!("response has no {target} element")));
            }
            _ => {}
        }
    }
}

fn soap_error(err: impl std::fmt::Display) -> ToolError {
    ToolError::Soap(err.to_string())
}
