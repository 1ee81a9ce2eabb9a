//! # Module Desc - Descriptions de devices et de services
//!
//! Ce module porte le modèle de données des fichiers de description UPnP :
//! la description du root device (devicedesc.xml) et les descriptions de
//! services (SCPD). Il sait les lire, les valider, les re-sérialiser et en
//! calculer une empreinte pour la détection de dérive de configuration.
//!
//! ## Architecture
//!
//! - [`RootDevice`] : Description complète du root device
//! - [`Device`] : Un device (racine ou embarqué), avec services et sous-devices
//! - [`Service`] : Description SCPD d'un service (actions + table d'état)
//! - [`ServiceMap`] : id de service → description SCPD

mod errors;
mod hash;
mod parse;
mod render;
mod validate;

use std::collections::HashMap;

pub use errors::DescError;

/// Indicateur UPnP du root device.
pub const UPNP_ROOT_DEVICE_TYPE: &str = "upnp:rootdevice";

/// Namespace XML des descriptions de device.
pub const DEVICE_NAMESPACE: &str = "urn:schemas-upnp-org:device-1-0";

/// Namespace XML des descriptions de service.
pub const SERVICE_NAMESPACE: &str = "urn:schemas-upnp-org:service-1-0";

/// Version de la spécification portée par une description.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecVersion {
    pub major: i32,
    pub minor: i32,
}

/// Description du root device.
#[derive(Debug, Clone, Default)]
pub struct RootDevice {
    pub config_id: u32,
    pub spec_version: SpecVersion,
    pub device: Device,
}

/// Description d'un device (racine ou embarqué).
#[derive(Debug, Clone, Default)]
pub struct Device {
    pub device_type: String,
    pub friendly_name: String,
    pub manufacturer: String,
    pub manufacturer_url: String,
    pub model_description: String,
    pub model_name: String,
    pub model_number: String,
    pub model_url: String,
    pub serial_number: String,
    pub udn: String,
    pub upc: String,
    pub icons: Vec<Icon>,
    pub services: Vec<ServiceReference>,
    pub devices: Vec<Device>,
    pub presentation_url: String,
}

/// Icône déclarée dans une description de device.
#[derive(Debug, Clone, Default)]
pub struct Icon {
    pub mimetype: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub url: String,
}

/// Référence de service dans une description de device.
#[derive(Debug, Clone, Default)]
pub struct ServiceReference {
    pub service_type: String,
    pub service_id: String,
    pub scpd_url: String,
    pub control_url: String,
    pub event_sub_url: String,
}

/// Description SCPD d'un service.
#[derive(Debug, Clone, Default)]
pub struct Service {
    pub config_id: u32,
    pub spec_version: SpecVersion,
    pub actions: Vec<Action>,
    pub state_table: Vec<StateVariable>,
}

/// id de service (partie finale) → description SCPD.
pub type ServiceMap = HashMap<String, Service>;

/// Action déclarée dans une SCPD.
#[derive(Debug, Clone, Default)]
pub struct Action {
    pub name: String,
    pub arguments: Vec<Argument>,
}

/// Argument d'une action.
#[derive(Debug, Clone, Default)]
pub struct Argument {
    pub name: String,
    pub direction: String,
    pub related_state_variable: String,
}

/// Variable d'état déclarée dans une SCPD.
#[derive(Debug, Clone, Default)]
pub struct StateVariable {
    pub name: String,
    pub data_type: String,
    pub default_value: String,
    pub send_events: bool,
    pub multicast: bool,
    pub allowed_values: Vec<String>,
    pub allowed_range: Option<AllowedValueRange>,
}

/// Plage autorisée déclarée pour une variable numérique.
#[derive(Debug, Clone, Default)]
pub struct AllowedValueRange {
    pub minimum: String,
    pub maximum: String,
    pub step: String,
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Descriptions partagées par les tests des couches supérieures.

    use super::{RootDevice, Service, ServiceMap};

    pub const DEVICE_XML: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" configId="3">
  <specVersion><major>2</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
    <friendlyName>Test Server</friendlyName>
    <manufacturer>ACME</manufacturer>
    <modelName>TestModel</modelName>
    <UDN>uuid:11111111-1111-1111-1111-111111111111</UDN>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ContentDirectory:3</serviceType>
        <serviceId>urn:upnp-org:serviceId:CD</serviceId>
        <SCPDURL>/services/desc/CD.xml</SCPDURL>
        <controlURL>/services/control/CD</controlURL>
        <eventSubURL>/services/eventSub/CD</eventSubURL>
      </service>
    </serviceList>
    <presentationURL>/index.html</presentationURL>
  </device>
</root>"#;

    pub const SERVICE_XML: &str = r#"<?xml version="1.0"?>
<scpd xmlns="urn:schemas-upnp-org:service-1-0" configId="3">
  <specVersion><major>2</major><minor>0</minor></specVersion>
  <actionList>
    <action>
      <name>SetCounter</name>
      <argumentList>
        <argument>
          <name>Value</name>
          <direction>in</direction>
          <relatedStateVariable>Counter</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
    <action>
      <name>SetMode</name>
      <argumentList>
        <argument>
          <name>Mode</name>
          <direction>in</direction>
          <relatedStateVariable>Mode</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
  </actionList>
  <serviceStateTable>
    <stateVariable sendEvents="yes" multicast="yes">
      <name>Counter</name>
      <dataType>ui4</dataType>
      <defaultValue>0</defaultValue>
      <allowedValueRange>
        <minimum>0</minimum>
        <maximum>10</maximum>
      </allowedValueRange>
    </stateVariable>
    <stateVariable sendEvents="yes">
      <name>Mode</name>
      <dataType>string</dataType>
      <defaultValue>NORMAL</defaultValue>
      <allowedValueList>
        <allowedValue>NORMAL</allowedValue>
        <allowedValue>SHUFFLE</allowedValue>
      </allowedValueList>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>A_ARG_TYPE_Filter</name>
      <dataType>string</dataType>
    </stateVariable>
  </serviceStateTable>
</scpd>"#;

    pub fn root_device() -> RootDevice {
        RootDevice::from_reader(DEVICE_XML.as_bytes()).unwrap()
    }

    pub fn service_map() -> ServiceMap {
        let mut map = ServiceMap::new();
        map.insert(
            "CD".to_string(),
            Service::from_reader(SERVICE_XML.as_bytes()).unwrap(),
        );
        map
    }
}
