//! # Module State Variables - Variables d'état UPnP
//!
//! Ce module implémente les cellules typées qui portent l'état des services :
//! valeur courante sous mutex, défaut, plage ou liste de valeurs autorisées,
//! drapeaux d'éventing, et notification des changements vers le moteur
//! d'événements.
//!
//! ## Fonctionnalités
//!
//! - ✅ Cellule typée avec mutex par variable
//! - ✅ `set` met à jour la valeur puis notifie (jamais l'inverse)
//! - ✅ Comparaison par valeur : pas de notification si rien ne change
//! - ✅ Validation des arguments SOAP (plage → 601, liste → 600)

mod methods;
mod errors;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

pub use errors::StateVariableError;

use crate::{
    value_ranges::ValueRange,
    variable_types::{StateValue, StateVarType},
};

/// Canal d'entrée du moteur d'événements.
///
/// Chaque setter y pousse la variable modifiée ; le dispatcher périodique
/// draine et fan-out. Le canal est borné : en cas de débordement le
/// changement est perdu avec un avertissement.
pub type ChangeSender = mpsc::Sender<Arc<StateVariable>>;
pub type ChangeReceiver = mpsc::Receiver<Arc<StateVariable>>;

/// Capacité du canal de changements.
pub const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Contexte de service d'une variable, nécessaire aux messages d'événements.
#[derive(Debug, Clone)]
pub struct VariableContext {
    /// Partie finale de l'id de service (après `urn:<domain>:serviceId:`)
    pub service_id: String,

    /// Type de service sans la version (`urn:<domain>:service:<kind>`)
    pub service_type: String,

    /// Version du type de service
    pub service_version: String,

    /// UDN du device propriétaire
    pub device_udn: String,
}

/// Cellule d'état typée d'un service UPnP.
pub struct StateVariable {
    name: String,
    var_type: StateVarType,
    value: Mutex<StateValue>,
    default: Option<StateValue>,
    range: Option<ValueRange>,
    allowed: Option<Vec<String>>,
    to_be_evented: bool,
    to_be_multicasted: bool,
    context: VariableContext,
    changes: ChangeSender,
}

impl std::fmt::Debug for StateVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateVariable")
            .field("name", &self.name)
            .field("var_type", &self.var_type)
            .field("value", &self.value)
            .field("to_be_evented", &self.to_be_evented)
            .field("to_be_multicasted", &self.to_be_multicasted)
            .finish()
    }
}
