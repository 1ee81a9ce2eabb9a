//! # Module Model - Arbre de devices et registre de services runtime
//!
//! Ce module construit la forme exploitable de l'arbre de devices : un arena
//! plat de devices indexés, et un registre id de service → service. Chaque
//! service porte ses variables d'état instanciées et, par action, la table
//! argument d'entrée → variable d'état qui fonde la validation SOAP.
//!
//! Les références croisées device ↔ service passent par des index, pas par
//! des pointeurs partagés : un service connaît l'index de son device, un
//! device la liste des ids de ses services.

mod build;
mod errors;

use std::collections::HashMap;
use std::sync::Arc;

pub use build::build;
pub use errors::ModelError;

use crate::desc;
use crate::state_variables::StateVariable;

/// Un device du runtime, dans l'arena.
#[derive(Debug)]
pub struct DeviceNode {
    pub udn: String,
    pub device_type: String,
    pub friendly_name: String,
    /// ids (partie finale) des services portés par ce device
    pub services: Vec<String>,
    /// index des devices embarqués
    pub children: Vec<usize>,
}

/// Arena des devices. La racine est toujours l'index 0.
#[derive(Debug, Default)]
pub struct DeviceTree {
    nodes: Vec<DeviceNode>,
}

impl DeviceTree {
    pub fn root(&self) -> &DeviceNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> &DeviceNode {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceNode> {
        self.nodes.iter()
    }
}

/// Service runtime.
#[derive(Debug)]
pub struct Service {
    /// id (partie finale, unique dans tout l'arbre)
    id: String,
    /// type sans version (`urn:<domain>:service:<kind>`)
    service_type: String,
    /// version du type
    version: String,
    /// index du device propriétaire dans l'arena
    device: usize,
    state_vars: HashMap<String, Arc<StateVariable>>,
    /// action → (argument d'entrée → variable d'état)
    act_specs: HashMap<String, HashMap<String, Arc<StateVariable>>>,
    /// description SCPD d'origine, servie par l'endpoint de description
    desc: desc::Service,
}

/// id de service (partie finale) → service runtime.
pub type ServiceMap = HashMap<String, Arc<Service>>;

impl Service {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type sans version.
    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Type versionné (`urn:<domain>:service:<kind>:<version>`).
    pub fn versioned_type(&self) -> String {
        format!("{}:{}", self.service_type, self.version)
    }

    pub fn device_index(&self) -> usize {
        self.device
    }

    pub fn state_var(&self, name: &str) -> Option<&Arc<StateVariable>> {
        self.state_vars.get(name)
    }

    pub fn state_vars(&self) -> impl Iterator<Item = &Arc<StateVariable>> {
        self.state_vars.values()
    }

    /// Table des arguments d'entrée d'une action.
    pub fn action_spec(&self, action: &str) -> Option<&HashMap<String, Arc<StateVariable>>> {
        self.act_specs.get(action)
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.act_specs.contains_key(action)
    }

    pub fn desc(&self) -> &desc::Service {
        &self.desc
    }
}
