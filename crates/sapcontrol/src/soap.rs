//! Minimal SOAP 1.1 envelope encoding and response parsing.
//!
//! Responses are parsed into a small element tree keyed by local names, so
//! namespace prefixes (`SOAP-ENV:`, `SAPControl:`) do not matter.

use crate::error::{Error, Result};
use crate::types::{
    HaCheck, HaFailoverConfig, InstanceProperty, OsProcess, SapInstance, SystemRequest,
    VersionInfo,
};
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SAPCONTROL_NS: &str = "urn:SAPControl";

/// XML element with its local name, text content and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// First direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the direct child `name`, empty when absent.
    pub fn text_of(&self, name: &str) -> String {
        self.child(name).map(|c| c.text.clone()).unwrap_or_default()
    }

    /// Depth-first search for the first element called `name`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// `<item>` children of the direct child `list`.
    pub fn items(&self, list: &str) -> Vec<&Element> {
        self.child(list)
            .map(|l| l.children.iter().filter(|c| c.name == "item").collect())
            .unwrap_or_default()
    }
}

/// Build a request envelope for `action` with pre-rendered body parameters.
pub fn envelope(action: &str, params: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="{env}" xmlns:SAPControl="{ns}">"#,
            "<SOAP-ENV:Body><SAPControl:{action}>{params}</SAPControl:{action}></SOAP-ENV:Body>",
            "</SOAP-ENV:Envelope>"
        ),
        env = ENVELOPE_NS,
        ns = SAPCONTROL_NS,
        action = action,
        params = params,
    )
}

/// Body parameters of `StartSystem`/`StopSystem`.
pub fn system_params(request: &SystemRequest) -> String {
    let mut params = format!("<options>{}</options>", escape(request.options.as_str()));
    if let Some(timeout) = request.wait_timeout_secs {
        params.push_str(&format!("<waittimeout>{timeout}</waittimeout>"));
    }
    params
}

/// Parse an XML document into an element tree.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element {
                name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                ..Default::default()
            }),
            Ok(Event::Empty(e)) => {
                let element = Element {
                    name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    ..Default::default()
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(Error::Xml("unbalanced closing tag".to_string()));
                }
                if let Some(done) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(done);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::Xml(e.to_string())),
        }
    }

    if stack.len() != 1 {
        return Err(Error::Xml("unexpected end of document".to_string()));
    }
    stack
        .pop()
        .and_then(|root| root.children.into_iter().next())
        .ok_or_else(|| Error::Xml("empty document".to_string()))
}

/// Extract the `<{action}Response>` element, surfacing SOAP faults.
pub fn response_body(xml: &str, action: &str) -> Result<Element> {
    let root = parse(xml)?;

    if let Some(fault) = root.find("Fault") {
        return Err(Error::Fault {
            code: fault.text_of("faultcode"),
            message: fault.text_of("faultstring"),
        });
    }

    let name = format!("{action}Response");
    root.find(&name)
        .cloned()
        .ok_or(Error::MissingElement(name))
}

fn parse_number<T: std::str::FromStr>(element: &Element, field: &str) -> Result<T> {
    let raw = element.text_of(field);
    raw.trim().parse().map_err(|_| Error::InvalidValue {
        field: field.to_string(),
        value: raw,
    })
}

pub fn parse_instance_properties(body: &Element) -> Result<Vec<InstanceProperty>> {
    Ok(body
        .items("properties")
        .into_iter()
        .map(|item| InstanceProperty {
            property: item.text_of("property"),
            propertytype: item.text_of("propertytype"),
            value: item.text_of("value"),
        })
        .collect())
}

pub fn parse_process_list(body: &Element) -> Result<Vec<OsProcess>> {
    body.items("process")
        .into_iter()
        .map(|item| {
            Ok(OsProcess {
                name: item.text_of("name"),
                description: item.text_of("description"),
                dispstatus: item.text_of("dispstatus").parse()?,
                textstatus: item.text_of("textstatus"),
                starttime: item.text_of("starttime"),
                elapsedtime: item.text_of("elapsedtime"),
                pid: parse_number(item, "pid")?,
            })
        })
        .collect()
}

pub fn parse_system_instance_list(body: &Element) -> Result<Vec<SapInstance>> {
    body.items("instance")
        .into_iter()
        .map(|item| {
            Ok(SapInstance {
                hostname: item.text_of("hostname"),
                instance_nr: parse_number(item, "instanceNr")?,
                http_port: parse_number(item, "httpPort")?,
                https_port: parse_number(item, "httpsPort")?,
                start_priority: item.text_of("startPriority"),
                features: item.text_of("features"),
                dispstatus: item.text_of("dispstatus").parse()?,
            })
        })
        .collect()
}

pub fn parse_ha_check_config(body: &Element) -> Result<Vec<HaCheck>> {
    Ok(body
        .items("check")
        .into_iter()
        .map(|item| HaCheck {
            state: item.text_of("state"),
            category: item.text_of("category"),
            description: item.text_of("description"),
            comment: item.text_of("comment"),
        })
        .collect())
}

pub fn parse_ha_failover_config(body: &Element) -> Result<HaFailoverConfig> {
    Ok(HaFailoverConfig {
        ha_active: body.text_of("HAActive").trim() == "true",
        ha_product_version: body.text_of("HAProductVersion"),
        ha_sap_interface_version: body.text_of("HASAPInterfaceVersion"),
        ha_documentation: body.text_of("HADocumentation"),
        ha_active_nodes: body
            .items("HAActiveNode")
            .into_iter()
            .map(|item| item.text.clone())
            .collect(),
    })
}

pub fn parse_version_info(body: &Element) -> Result<Vec<VersionInfo>> {
    Ok(body
        .items("version")
        .into_iter()
        .map(|item| VersionInfo {
            filename: item.text_of("Filename"),
            version_info: item.text_of("VersionInfo"),
            time: item.text_of("Time"),
        })
        .collect())
}
