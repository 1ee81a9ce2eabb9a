//! SOAP Faults pour UPnP

use xmltree::{Element, XMLNode};

use crate::soap::SoapError;

/// Construit le document SOAP Fault d'une erreur UPnP.
///
/// Le fault porte toujours `faultcode` s:Client et `faultstring` UPnPError,
/// le code applicatif est dans le bloc `<detail><UPnPError>`.
pub fn build_soap_fault(err: &SoapError) -> Result<String, xmltree::Error> {
    let mut fault = Element::new("s:Fault");

    let mut faultcode = Element::new("faultcode");
    faultcode
        .children
        .push(XMLNode::Text("s:Client".to_string()));
    fault.children.push(XMLNode::Element(faultcode));

    let mut faultstring = Element::new("faultstring");
    faultstring
        .children
        .push(XMLNode::Text("UPnPError".to_string()));
    fault.children.push(XMLNode::Element(faultstring));

    let mut detail = Element::new("detail");

    let mut upnp_error = Element::new("UPnPError");
    upnp_error.attributes.insert(
        "xmlns".to_string(),
        "urn:schemas-upnp-org:control-1-0".to_string(),
    );

    let mut error_code = Element::new("errorCode");
    error_code
        .children
        .push(XMLNode::Text(err.code.code().to_string()));
    upnp_error.children.push(XMLNode::Element(error_code));

    let mut error_desc = Element::new("errorDescription");
    error_desc.children.push(XMLNode::Text(err.desc.clone()));
    upnp_error.children.push(XMLNode::Element(error_desc));

    detail.children.push(XMLNode::Element(upnp_error));
    fault.children.push(XMLNode::Element(detail));

    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(fault));

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
    use crate::soap::UpnpErrorCode;

    #[test]
    fn test_build_fault() {
        let xml = build_soap_fault(&SoapError::new(
            UpnpErrorCode::ArgValOutOfRange,
            "arg Value is not valid: 42",
        ))
        .unwrap();

        assert!(xml.contains("<s:Fault>"));
        assert!(xml.contains("<faultcode>s:Client</faultcode>"));
        assert!(xml.contains("<faultstring>UPnPError</faultstring>"));
        assert!(xml.contains("<errorCode>601</errorCode>"));
        assert!(xml.contains("<errorDescription>arg Value is not valid: 42</errorDescription>"));
    }

    #[test]
    fn test_error_codes_on_the_wire() {
        assert_eq!(UpnpErrorCode::InvalidAction.code(), 400);
        assert_eq!(UpnpErrorCode::InvalidArgs.code(), 402);
        assert_eq!(UpnpErrorCode::ActionFailed.code(), 501);
        assert_eq!(UpnpErrorCode::ArgValInvalid.code(), 600);
        assert_eq!(UpnpErrorCode::ArgValOutOfRange.code(), 601);
        assert_eq!(UpnpErrorCode::OptActionNotImplemented.code(), 602);
        assert_eq!(UpnpErrorCode::HumanRequired.code(), 604);
        assert_eq!(UpnpErrorCode::StrTooLong.code(), 605);
    }
}
