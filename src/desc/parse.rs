//! Lecture des descriptions XML vers le modèle de données.

use std::io::Read;
use std::path::Path;

use xmltree::Element;

use crate::desc::{
    Action, AllowedValueRange, Argument, DescError, Device, Icon, RootDevice, Service,
    ServiceReference, SpecVersion, StateVariable, DEVICE_NAMESPACE, SERVICE_NAMESPACE,
};

fn child_text(elem: &Element, name: &str) -> String {
    elem.get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn child_u32(elem: &Element, name: &str) -> u32 {
    child_text(elem, name).parse().unwrap_or_default()
}

fn attr_u32(elem: &Element, name: &str) -> u32 {
    elem.attributes
        .get(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

fn spec_version(elem: &Element) -> SpecVersion {
    match elem.get_child("specVersion") {
        Some(sv) => SpecVersion {
            major: child_text(sv, "major").parse().unwrap_or_default(),
            minor: child_text(sv, "minor").parse().unwrap_or_default(),
        },
        None => SpecVersion::default(),
    }
}

impl RootDevice {
    /// Lit une description de root device.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DescError> {
        let root = Element::parse(reader)?;
        if root.name != "root" {
            return Err(DescError::Malformed(format!(
                "expected <root> element, got <{}>",
                root.name
            )));
        }
        if root.namespace.as_deref() != Some(DEVICE_NAMESPACE) {
            return Err(DescError::Malformed(format!(
                "incorrect XML namespace: {}",
                root.namespace.as_deref().unwrap_or("")
            )));
        }

        let device = root
            .get_child("device")
            .ok_or_else(|| DescError::Malformed("missing <device> element".to_string()))?;

        Ok(Self {
            config_id: attr_u32(&root, "configId"),
            spec_version: spec_version(&root),
            device: Device::from_element(device),
        })
    }

    /// Lit une description de root device depuis un fichier.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DescError> {
        let data = std::fs::read(path)?;
        Self::from_reader(data.as_slice())
    }
}

impl Device {
    fn from_element(elem: &Element) -> Self {
        let icons = elem
            .get_child("iconList")
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name == "icon")
                    .map(|e| Icon {
                        mimetype: child_text(e, "mimetype"),
                        width: child_u32(e, "width"),
                        height: child_u32(e, "height"),
                        depth: child_u32(e, "depth"),
                        url: child_text(e, "url"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let services = elem
            .get_child("serviceList")
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name == "service")
                    .map(|e| ServiceReference {
                        service_type: child_text(e, "serviceType"),
                        service_id: child_text(e, "serviceId"),
                        scpd_url: child_text(e, "SCPDURL"),
                        control_url: child_text(e, "controlURL"),
                        event_sub_url: child_text(e, "eventSubURL"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let devices = elem
            .get_child("deviceList")
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name == "device")
                    .map(Device::from_element)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            device_type: child_text(elem, "deviceType"),
            friendly_name: child_text(elem, "friendlyName"),
            manufacturer: child_text(elem, "manufacturer"),
            manufacturer_url: child_text(elem, "manufacturerURL"),
            model_description: child_text(elem, "modelDescription"),
            model_name: child_text(elem, "modelName"),
            model_number: child_text(elem, "modelNumber"),
            model_url: child_text(elem, "modelURL"),
            serial_number: child_text(elem, "serialNumber"),
            udn: child_text(elem, "UDN"),
            upc: child_text(elem, "UPC"),
            icons,
            services,
            devices,
            presentation_url: child_text(elem, "presentationURL"),
        }
    }
}

impl Service {
    /// Lit une description SCPD.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DescError> {
        let root = Element::parse(reader)?;
        if root.name != "scpd" {
            return Err(DescError::Malformed(format!(
                "expected <scpd> element, got <{}>",
                root.name
            )));
        }
        if root.namespace.as_deref() != Some(SERVICE_NAMESPACE) {
            return Err(DescError::Malformed(format!(
                "incorrect XML namespace: {}",
                root.namespace.as_deref().unwrap_or("")
            )));
        }

        let actions = root
            .get_child("actionList")
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name == "action")
                    .map(Action::from_element)
                    .collect()
            })
            .unwrap_or_default();

        let state_table = root
            .get_child("serviceStateTable")
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name == "stateVariable")
                    .map(StateVariable::from_element)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            config_id: attr_u32(&root, "configId"),
            spec_version: spec_version(&root),
            actions,
            state_table,
        })
    }

    /// Lit une description SCPD depuis un fichier.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DescError> {
        let data = std::fs::read(path)?;
        Self::from_reader(data.as_slice())
    }
}

impl Action {
    fn from_element(elem: &Element) -> Self {
        let arguments = elem
            .get_child("argumentList")
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name == "argument")
                    .map(|e| Argument {
                        name: child_text(e, "name"),
                        direction: child_text(e, "direction").to_lowercase(),
                        related_state_variable: child_text(e, "relatedStateVariable"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: child_text(elem, "name"),
            arguments,
        }
    }
}

impl StateVariable {
    fn from_element(elem: &Element) -> Self {
        let allowed_values = elem
            .get_child("allowedValueList")
            .map(|list| {
                list.children
                    .iter()
                    .filter_map(|n| n.as_element())
                    .filter(|e| e.name == "allowedValue")
                    .filter_map(|e| e.get_text())
                    .map(|t| t.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let allowed_range = elem.get_child("allowedValueRange").map(|r| AllowedValueRange {
            minimum: child_text(r, "minimum"),
            maximum: child_text(r, "maximum"),
            step: child_text(r, "step"),
        });

        // sendEvents vaut "yes" par défaut dans la spécification UPnP
        let send_events = elem
            .attributes
            .get("sendEvents")
            .map(|v| v == "yes")
            .unwrap_or(true);
        let multicast = elem
            .attributes
            .get("multicast")
            .map(|v| v == "yes")
            .unwrap_or(false);

        Self {
            name: child_text(elem, "name"),
            data_type: child_text(elem, "dataType"),
            default_value: child_text(elem, "defaultValue"),
            send_events,
            multicast,
            allowed_values,
            allowed_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::fixtures::{DEVICE_XML, SERVICE_XML};

    #[test]
    fn test_parse_root_device() {
        let root = RootDevice::from_reader(DEVICE_XML.as_bytes()).unwrap();
        assert_eq!(root.config_id, 3);
        assert_eq!(root.spec_version.major, 2);
        assert_eq!(root.device.friendly_name, "Test Server");
        assert_eq!(root.device.services.len(), 1);
        assert_eq!(root.device.services[0].service_id, "urn:upnp-org:serviceId:CD");
    }

    #[test]
    fn test_parse_scpd() {
        let svc = Service::from_reader(SERVICE_XML.as_bytes()).unwrap();
        assert_eq!(svc.actions.len(), 2);
        assert_eq!(svc.actions[0].arguments[0].direction, "in");
        let sv = &svc.state_table[0];
        assert!(sv.send_events);
        assert!(sv.multicast);
        assert_eq!(sv.allowed_range.as_ref().unwrap().maximum, "10");
    }

    #[test]
    fn test_wrong_namespace_rejected() {
        let xml = DEVICE_XML.replace("device-1-0", "device-2-0");
        assert!(RootDevice::from_reader(xml.as_bytes()).is_err());
    }
}
