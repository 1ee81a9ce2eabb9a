//! Construction de réponses SOAP

use xmltree::{Element, XMLNode};

/// Construit la réponse SOAP d'une action UPnP.
///
/// # Arguments
///
/// * `service_urn` - URN versionné du service (ex: "urn:schemas-upnp-org:service:AVTransport:1")
/// * `action` - Nom de l'action (ex: "GetPositionInfo")
/// * `args` - Arguments de sortie, dans l'ordre de restitution
///
/// # Returns
///
/// Le document SOAP complet sous forme de String
pub fn build_action_response(
    service_urn: &str,
    action: &str,
    args: &[(String, String)],
) -> Result<String, xmltree::Error> {
    // Format: <u:ActionNameResponse xmlns:u="service-urn">
    let response_name = format!("u:{}Response", action);
    let mut response_elem = Element::new(&response_name);
    response_elem
        .attributes
        .insert("xmlns:u".to_string(), service_urn.to_string());

    for (name, value) in args {
        let mut child = Element::new(name);
        child.children.push(XMLNode::Text(value.clone()));
        response_elem.children.push(XMLNode::Element(child));
    }

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(response_elem));

    let mut envelope = Element::new("s:Envelope");
    envelope.attributes.insert(
        "xmlns:s".to_string(),
        "http://schemas.xmlsoap.org/soap/envelope/".to_string(),
    );
    envelope.attributes.insert(
        "s:encodingStyle".to_string(),
        "http://schemas.xmlsoap.org/soap/encoding/".to_string(),
    );
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    envelope.write(&mut buf)?;

    Ok(String::from_utf8(buf).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_response() {
        let args = vec![
            ("Track".to_string(), "5".to_string()),
            ("TrackDuration".to_string(), "00:03:45".to_string()),
        ];

        let xml = build_action_response(
            "urn:schemas-upnp-org:service:AVTransport:1",
            "GetPositionInfo",
            &args,
        )
        .unwrap();

        assert!(xml.contains("GetPositionInfoResponse"));
        assert!(xml.contains("<Track>5</Track>"));
        assert!(xml.contains("<TrackDuration>00:03:45</TrackDuration>"));
        assert!(xml.contains("xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\""));
    }

    #[test]
    fn test_build_empty_response() {
        let xml =
            build_action_response("urn:schemas-upnp-org:service:AVTransport:1", "Stop", &[])
                .unwrap();

        assert!(xml.contains("StopResponse"));
        assert!(xml.contains("xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\""));
    }

    #[test]
    fn test_values_are_escaped() {
        let args = vec![("Result".to_string(), "<DIDL-Lite/>".to_string())];
        let xml = build_action_response(
            "urn:schemas-upnp-org:service:ContentDirectory:1",
            "Browse",
            &args,
        )
        .unwrap();
        assert!(xml.contains("&lt;DIDL-Lite/&gt;"));
    }
}
