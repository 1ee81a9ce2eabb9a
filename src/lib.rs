//! # pmodevice - Serveur UPnP 2.0 côté device
//!
//! Cette crate implémente un serveur UPnP conforme à l'UPnP Device
//! Architecture 2.0 : elle annonce un arbre de devices et de services sur le
//! réseau local (SSDP), répond aux requêtes de découverte, traite les
//! invocations de contrôle (SOAP) et livre les notifications d'événements
//! aux abonnés.
//!
//! ## Fonctionnalités
//!
//! - ✅ Découverte SSDP par interface : alive/byebye, réponses M-SEARCH
//! - ✅ Eventing : NOTIFY multicast et abonnements unicast avec séquence
//! - ✅ Contrôle SOAP : validation typée des arguments, faults UPnP
//! - ✅ Variables d'état typées : plages, listes de valeurs, verrou par cellule
//! - ✅ BOOTID/CONFIGID persistés, détection de dérive des descriptions
//!
//! ## Example
//!
//! ```rust,no_run
//! use pmodevice::{Config, UpnpServer};
//! use pmodevice::desc::{RootDevice, Service, ServiceMap};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root = RootDevice::from_file("devicedesc.xml")?;
//! let mut services = ServiceMap::new();
//! services.insert("CD".to_string(), Service::from_file("contentdirectory.xml")?);
//!
//! let mut server = UpnpServer::new(Config::default(), root, services)?;
//!
//! server.soap_handle_fn("CD", "Browse", |args| async move {
//!     Ok(vec![("NumberReturned".to_string(), "0".to_string())])
//! });
//!
//! let cancel = CancellationToken::new();
//! server.run(cancel).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod desc;
pub mod events;
pub mod ids;
pub mod model;
pub mod network;
pub mod server;
pub mod soap;
pub mod ssdp;
pub mod state_variables;
pub mod status;
pub mod value_ranges;
pub mod variable_types;

pub use crate::config::Config;
pub use crate::server::{
    ServerError, ServerState, SoapArgs, SoapHandler, SoapRespArgs, UpnpServer,
};
pub use crate::soap::{SoapError, UpnpErrorCode};
pub use crate::state_variables::{StateVariable, StateVariableError};
pub use crate::variable_types::{StateValue, StateValueError, StateVarType, UpnpVarType};
