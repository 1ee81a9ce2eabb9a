//! Validation des descriptions.
//!
//! La validation court sur les données brutes, avant toute construction du
//! modèle runtime. Les problèmes s'accumulent dans une liste de messages ;
//! la construction du serveur exige une liste vide.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;
use uuid::Uuid;

use crate::desc::{Action, Argument, Device, RootDevice, Service, ServiceReference, StateVariable};
use crate::value_ranges::ValueRange;
use crate::variable_types::{StateValue, StateVarType, UpnpVarType};

static RE_DEVICE_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"urn:.+:device:.*:\d+").unwrap());
static RE_SERVICE_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"urn:.+:service:.*:\d+").unwrap());
static RE_SERVICE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"urn:.+:serviceId:.+").unwrap());

impl RootDevice {
    /// Valide la description du root device. Retourne la liste des problèmes
    /// trouvés (vide si tout va bien).
    pub fn validate(&self) -> Vec<String> {
        let mut findings = Vec::new();

        if self.spec_version.minor > self.spec_version.major {
            findings.push(format!(
                "root device: incorrect spec version: minor={} major={}",
                self.spec_version.minor, self.spec_version.major
            ));
        }

        self.device.validate(&mut findings);
        findings
    }
}

impl Device {
    pub(crate) fn validate(&self, findings: &mut Vec<String>) {
        if !RE_DEVICE_TYPE.is_match(&self.device_type) {
            findings.push(format!("device: wrong device type: {}", self.device_type));
        }
        if self.friendly_name.is_empty() {
            findings.push("device: friendly name must not be empty".to_string());
        }
        if self.manufacturer.is_empty() {
            findings.push("device: manufacturer must not be empty".to_string());
        }
        if !self.manufacturer_url.is_empty() && Url::parse(&self.manufacturer_url).is_err() {
            findings.push(format!(
                "device: incorrect manufacturer URL: {}",
                self.manufacturer_url
            ));
        }
        if self.model_name.is_empty() {
            findings.push("device: model name must not be empty".to_string());
        }
        if !self.model_url.is_empty() && Url::parse(&self.model_url).is_err() {
            findings.push(format!("device: incorrect model URL: {}", self.model_url));
        }

        // un UDN est un UUID, avec ou sans le préfixe "uuid:"
        let raw_udn = self.udn.strip_prefix("uuid:").unwrap_or(&self.udn);
        if Uuid::parse_str(raw_udn).is_err() {
            findings.push(format!("device: incorrect UDN '{}'", self.udn));
        }

        for svc in &self.services {
            svc.validate(findings);
        }
        for dvc in &self.devices {
            dvc.validate(findings);
        }
    }
}

impl ServiceReference {
    pub(crate) fn validate(&self, findings: &mut Vec<String>) {
        if !RE_SERVICE_TYPE.is_match(&self.service_type) {
            findings.push(format!(
                "service ref: wrong service type: {}",
                self.service_type
            ));
        }
        if !RE_SERVICE_ID.is_match(&self.service_id) {
            findings.push(format!(
                "service ref: mal-formed service ID: {}",
                self.service_id
            ));
        }
    }

    /// Partie finale de l'id de service, après `urn:<domain>:serviceId:`.
    pub fn id_tail(&self) -> &str {
        self.service_id.rsplit(':').next().unwrap_or("")
    }

    /// Type de service sans la version (`urn:<domain>:service:<kind>`).
    pub fn type_prefix(&self) -> String {
        match self.service_type.rsplit_once(':') {
            Some((prefix, _)) => prefix.to_string(),
            None => self.service_type.clone(),
        }
    }

    /// Version du type de service (dernier segment de l'URN).
    pub fn type_version(&self) -> String {
        self.service_type
            .rsplit(':')
            .next()
            .unwrap_or("")
            .to_string()
    }
}

impl Service {
    /// Valide une description SCPD.
    pub fn validate(&self) -> Vec<String> {
        let mut findings = Vec::new();

        if self.spec_version.minor > self.spec_version.major {
            findings.push(format!(
                "service: incorrect spec version: minor={} major={}",
                self.spec_version.minor, self.spec_version.major
            ));
        }
        if self.state_table.is_empty() {
            findings.push("service: has no state variables".to_string());
        }
        for act in &self.actions {
            act.validate(&mut findings);
        }
        for sv in &self.state_table {
            sv.validate(&mut findings);
        }
        findings
    }
}

impl Action {
    pub(crate) fn validate(&self, findings: &mut Vec<String>) {
        if self.name.is_empty() {
            findings.push("action: name must not be empty".to_string());
        }
        for arg in &self.arguments {
            arg.validate(findings);
        }
    }
}

impl Argument {
    pub(crate) fn validate(&self, findings: &mut Vec<String>) {
        if self.name.is_empty() {
            findings.push("argument: name must not be empty".to_string());
        }
        if self.direction != "in" && self.direction != "out" {
            findings.push(format!(
                "argument '{}': direction must be 'in' or 'out', got '{}'",
                self.name, self.direction
            ));
        }
        if self.related_state_variable.is_empty() {
            findings.push(format!(
                "argument '{}': related state variable must not be empty",
                self.name
            ));
        }
    }
}

impl StateVariable {
    pub(crate) fn validate(&self, findings: &mut Vec<String>) {
        if self.name.is_empty() {
            findings.push("state variable: name must not be empty".to_string());
            return;
        }

        let var_type = match StateVarType::from_str(&self.data_type) {
            Ok(t) => t,
            Err(_) => {
                findings.push(format!(
                    "state variable '{}': unknown data type '{}'",
                    self.name, self.data_type
                ));
                return;
            }
        };

        // une plage n'a de sens que pour une variable numérique, une liste de
        // valeurs que pour une variable chaîne
        if self.allowed_range.is_some() && !var_type.is_numeric() {
            findings.push(format!(
                "state variable '{}': allowed range on non-numeric type {}",
                self.name, var_type
            ));
        }
        if !self.allowed_values.is_empty() && var_type != StateVarType::String {
            findings.push(format!(
                "state variable '{}': allowed value list on non-string type {}",
                self.name, var_type
            ));
        }

        if let Some(range) = &self.allowed_range {
            if var_type.is_numeric() {
                let min = StateValue::parse(var_type, &range.minimum);
                let max = StateValue::parse(var_type, &range.maximum);
                match (min, max) {
                    (Ok(min), Ok(max)) => {
                        if ValueRange::new(&min, &max, None).is_err() {
                            findings.push(format!(
                                "state variable '{}': range minimum exceeds maximum",
                                self.name
                            ));
                        }
                    }
                    _ => findings.push(format!(
                        "state variable '{}': range endpoints do not parse as {}",
                        self.name, var_type
                    )),
                }
            }
        }

        if !self.default_value.is_empty()
            && StateValue::parse(var_type, &self.default_value).is_err()
        {
            findings.push(format!(
                "state variable '{}': default value '{}' does not parse as {}",
                self.name, self.default_value, var_type
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::desc::fixtures;
    use crate::desc::Service;

    #[test]
    fn test_valid_descriptions_have_no_findings() {
        assert!(fixtures::root_device().validate().is_empty());
        let svc = Service::from_reader(fixtures::SERVICE_XML.as_bytes()).unwrap();
        assert!(svc.validate().is_empty());
    }

    #[test]
    fn test_bad_udn_is_reported() {
        let mut root = fixtures::root_device();
        root.device.udn = "uuid:not-a-uuid".to_string();
        let findings = root.validate();
        assert!(findings.iter().any(|f| f.contains("incorrect UDN")));
    }

    #[test]
    fn test_inverted_range_is_reported() {
        let mut svc = Service::from_reader(fixtures::SERVICE_XML.as_bytes()).unwrap();
        let range = svc.state_table[0].allowed_range.as_mut().unwrap();
        range.minimum = "10".to_string();
        range.maximum = "0".to_string();
        let findings = svc.validate();
        assert!(findings.iter().any(|f| f.contains("minimum exceeds maximum")));
    }

    #[test]
    fn test_list_on_numeric_is_reported() {
        let mut svc = Service::from_reader(fixtures::SERVICE_XML.as_bytes()).unwrap();
        svc.state_table[0].allowed_values = vec!["1".to_string()];
        let findings = svc.validate();
        assert!(findings.iter().any(|f| f.contains("allowed value list")));
    }

    #[test]
    fn test_id_tail() {
        let root = fixtures::root_device();
        assert_eq!(root.device.services[0].id_tail(), "CD");
        assert_eq!(
            root.device.services[0].type_prefix(),
            "urn:schemas-upnp-org:service:ContentDirectory"
        );
        assert_eq!(root.device.services[0].type_version(), "3");
    }
}
