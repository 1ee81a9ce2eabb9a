//! Sérialisation des descriptions vers XML.

use xmltree::{Element, XMLNode};

use crate::desc::{
    Action, Device, DescError, RootDevice, Service, SpecVersion, StateVariable,
    DEVICE_NAMESPACE, SERVICE_NAMESPACE,
};

fn text_child(parent: &mut Element, name: &str, value: &str) {
    let mut child = Element::new(name);
    child.children.push(XMLNode::Text(value.to_string()));
    parent.children.push(XMLNode::Element(child));
}

fn optional_child(parent: &mut Element, name: &str, value: &str) {
    if !value.is_empty() {
        text_child(parent, name, value);
    }
}

fn spec_version_element(sv: &SpecVersion) -> Element {
    let mut elem = Element::new("specVersion");
    text_child(&mut elem, "major", &sv.major.to_string());
    text_child(&mut elem, "minor", &sv.minor.to_string());
    elem
}

fn write_document(root: Element) -> Result<String, DescError> {
    let mut buf = Vec::new();
    root.write(&mut buf)?;
    Ok(String::from_utf8(buf).unwrap())
}

impl RootDevice {
    pub fn to_element(&self) -> Element {
        let mut root = Element::new("root");
        root.attributes
            .insert("xmlns".to_string(), DEVICE_NAMESPACE.to_string());
        root.attributes
            .insert("configId".to_string(), self.config_id.to_string());
        root.children
            .push(XMLNode::Element(spec_version_element(&self.spec_version)));
        root.children.push(XMLNode::Element(self.device.to_element()));
        root
    }

    /// Sérialise la description complète, prologue XML inclus.
    pub fn to_xml(&self) -> Result<String, DescError> {
        write_document(self.to_element())
    }
}

impl Device {
    pub fn to_element(&self) -> Element {
        let mut elem = Element::new("device");
        text_child(&mut elem, "deviceType", &self.device_type);
        text_child(&mut elem, "friendlyName", &self.friendly_name);
        text_child(&mut elem, "manufacturer", &self.manufacturer);
        optional_child(&mut elem, "manufacturerURL", &self.manufacturer_url);
        optional_child(&mut elem, "modelDescription", &self.model_description);
        text_child(&mut elem, "modelName", &self.model_name);
        optional_child(&mut elem, "modelNumber", &self.model_number);
        optional_child(&mut elem, "modelURL", &self.model_url);
        optional_child(&mut elem, "serialNumber", &self.serial_number);
        text_child(&mut elem, "UDN", &self.udn);
        optional_child(&mut elem, "UPC", &self.upc);

        if !self.icons.is_empty() {
            let mut list = Element::new("iconList");
            for icon in &self.icons {
                let mut e = Element::new("icon");
                text_child(&mut e, "mimetype", &icon.mimetype);
                text_child(&mut e, "width", &icon.width.to_string());
                text_child(&mut e, "height", &icon.height.to_string());
                text_child(&mut e, "depth", &icon.depth.to_string());
                text_child(&mut e, "url", &icon.url);
                list.children.push(XMLNode::Element(e));
            }
            elem.children.push(XMLNode::Element(list));
        }

        if !self.services.is_empty() {
            let mut list = Element::new("serviceList");
            for svc in &self.services {
                let mut e = Element::new("service");
                text_child(&mut e, "serviceType", &svc.service_type);
                text_child(&mut e, "serviceId", &svc.service_id);
                text_child(&mut e, "SCPDURL", &svc.scpd_url);
                text_child(&mut e, "controlURL", &svc.control_url);
                text_child(&mut e, "eventSubURL", &svc.event_sub_url);
                list.children.push(XMLNode::Element(e));
            }
            elem.children.push(XMLNode::Element(list));
        }

        if !self.devices.is_empty() {
            let mut list = Element::new("deviceList");
            for dvc in &self.devices {
                list.children.push(XMLNode::Element(dvc.to_element()));
            }
            elem.children.push(XMLNode::Element(list));
        }

        optional_child(&mut elem, "presentationURL", &self.presentation_url);
        elem
    }
}

impl Service {
    pub fn to_element(&self) -> Element {
        let mut root = Element::new("scpd");
        root.attributes
            .insert("xmlns".to_string(), SERVICE_NAMESPACE.to_string());
        root.attributes
            .insert("configId".to_string(), self.config_id.to_string());
        root.children
            .push(XMLNode::Element(spec_version_element(&self.spec_version)));

        if !self.actions.is_empty() {
            let mut list = Element::new("actionList");
            for action in &self.actions {
                list.children.push(XMLNode::Element(action.to_element()));
            }
            root.children.push(XMLNode::Element(list));
        }

        let mut table = Element::new("serviceStateTable");
        for sv in &self.state_table {
            table.children.push(XMLNode::Element(sv.to_element()));
        }
        root.children.push(XMLNode::Element(table));

        root
    }

    /// Sérialise la SCPD complète, prologue XML inclus.
    pub fn to_xml(&self) -> Result<String, DescError> {
        write_document(self.to_element())
    }
}

impl Action {
    fn to_element(&self) -> Element {
        let mut elem = Element::new("action");
        text_child(&mut elem, "name", &self.name);
        if !self.arguments.is_empty() {
            let mut list = Element::new("argumentList");
            for arg in &self.arguments {
                let mut e = Element::new("argument");
                text_child(&mut e, "name", &arg.name);
                text_child(&mut e, "direction", &arg.direction);
                text_child(&mut e, "relatedStateVariable", &arg.related_state_variable);
                list.children.push(XMLNode::Element(e));
            }
            elem.children.push(XMLNode::Element(list));
        }
        elem
    }
}

impl StateVariable {
    fn to_element(&self) -> Element {
        let mut elem = Element::new("stateVariable");
        elem.attributes.insert(
            "sendEvents".to_string(),
            if self.send_events { "yes" } else { "no" }.to_string(),
        );
        if self.multicast {
            elem.attributes
                .insert("multicast".to_string(), "yes".to_string());
        }
        text_child(&mut elem, "name", &self.name);
        text_child(&mut elem, "dataType", &self.data_type);
        optional_child(&mut elem, "defaultValue", &self.default_value);

        if !self.allowed_values.is_empty() {
            let mut list = Element::new("allowedValueList");
            for v in &self.allowed_values {
                text_child(&mut list, "allowedValue", v);
            }
            elem.children.push(XMLNode::Element(list));
        }

        if let Some(range) = &self.allowed_range {
            let mut e = Element::new("allowedValueRange");
            text_child(&mut e, "minimum", &range.minimum);
            text_child(&mut e, "maximum", &range.maximum);
            optional_child(&mut e, "step", &range.step);
            elem.children.push(XMLNode::Element(e));
        }

        elem
    }
}

#[cfg(test)]
mod tests {
    use crate::desc::fixtures;
    use crate::desc::{RootDevice, Service};

    #[test]
    fn test_root_device_render_parse_round_trip() {
        let root = fixtures::root_device();
        let xml = root.to_xml().unwrap();
        let back = RootDevice::from_reader(xml.as_bytes()).unwrap();
        assert_eq!(back.config_id, root.config_id);
        assert_eq!(back.device.udn, root.device.udn);
        assert_eq!(back.device.services.len(), root.device.services.len());
    }

    #[test]
    fn test_service_render_parse_round_trip() {
        let svc = Service::from_reader(fixtures::SERVICE_XML.as_bytes()).unwrap();
        let xml = svc.to_xml().unwrap();
        let back = Service::from_reader(xml.as_bytes()).unwrap();
        assert_eq!(back.actions.len(), svc.actions.len());
        assert_eq!(back.state_table.len(), svc.state_table.len());
        assert_eq!(back.state_table[0].allowed_range.as_ref().unwrap().maximum, "10");
    }

    #[test]
    fn test_config_id_is_rendered() {
        let mut root = fixtures::root_device();
        root.config_id = 42;
        let xml = root.to_xml().unwrap();
        assert!(xml.contains(r#"configId="42""#));
    }
}
