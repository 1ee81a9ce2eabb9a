//! # Module Server - Serveur UPnP côté device
//!
//! Ce module assemble les moteurs en un serveur complet : descriptions HTTP,
//! contrôle SOAP, abonnements aux événements, découverte SSDP et persistance
//! du statut.
//!
//! ## Fonctionnalités
//!
//! - ✅ Construction depuis les descriptions (validation puis modèle runtime)
//! - ✅ Un serveur SSDP par interface utilisable
//! - ✅ Routage axum : descriptions, icônes, SCPD, contrôle, abonnements
//! - ✅ Handlers SOAP enregistrés par (service, action)
//! - ✅ Arrêt gracieux : byebye, résiliation des abonnements, snapshot
//!
//! ## Cycle de vie
//!
//! 1. [`UpnpServer::new`] : validation, modèle, relecture du statut
//! 2. [`UpnpServer::run`] : tout démarre, s'arrête à l'annulation du token
//! 3. [`UpnpServer::connect`] / [`disconnect`](UpnpServer::disconnect) :
//!    bascule de la découverte et de l'eventing en cours de route

mod handlers;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::desc;
use crate::events::Eventing;
use crate::ids::{BootId, ConfigId};
use crate::model::{self, DeviceTree, ModelError, ServiceMap};
use crate::network;
use crate::soap::SoapError;
use crate::ssdp::{self, DiscoveryData, SearchIndex, SsdpServer};
use crate::state_variables::{
    ChangeReceiver, StateVariable, CHANGE_CHANNEL_CAPACITY,
};
use crate::status::{self, Status, ROOT_HASH_KEY, SERVICE_HASH_PREFIX};
use crate::variable_types::StateValue;

/// Chemins des URLs servies par le serveur.
pub const DEVICE_DESC_PATH: &str = "/device/devicedesc.xml";
pub const DEVICE_ICON_PATH: &str = "/device/";
pub const SERVICE_DESC_PATH: &str = "/services/desc/";
pub const SERVICE_CONTROL_PATH: &str = "/services/control/";
pub const SERVICE_EVENT_SUB_PATH: &str = "/services/eventSub/";

/// Arguments typés d'une action SOAP, nom → valeur.
pub type SoapArgs = HashMap<String, StateValue>;

/// Arguments de réponse d'une action SOAP, dans l'ordre de restitution.
pub type SoapRespArgs = Vec<(String, String)>;

/// Futur retourné par un handler SOAP.
pub type SoapFuture = Pin<Box<dyn Future<Output = Result<SoapRespArgs, SoapError>> + Send>>;

/// Handler SOAP enregistré par couple (service, action).
pub type SoapHandler = Arc<dyn Fn(SoapArgs) -> SoapFuture + Send + Sync>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid descriptions: {0:?}")]
    InvalidDescription(Vec<String>),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Desc(#[from] desc::DescError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("No usable network interface found")]
    NoInterface,

    #[error("Status write failure: {0}")]
    StatusWrite(std::io::Error),
}

/// État partagé avec les handlers HTTP.
pub struct ServerState {
    cfg: Config,
    /// description du root device, URLs de services réécrites
    root_desc: desc::RootDevice,
    tree: DeviceTree,
    services: ServiceMap,
    boot_id: Arc<BootId>,
    config_id: Arc<ConfigId>,
    evt: Arc<Eventing>,
    soap_handlers: RwLock<HashMap<String, SoapHandler>>,
    locals: Mutex<HashMap<String, String>>,
    server_string: String,
    errs: mpsc::UnboundedSender<ServerError>,
}

/// Serveur UPnP côté device.
pub struct UpnpServer {
    inner: Arc<ServerState>,
    ssdp: Vec<SsdpServer>,
    listener: Option<std::net::TcpListener>,
    change_rx: Option<ChangeReceiver>,
    errs_rx: Option<mpsc::UnboundedReceiver<ServerError>>,
    evt_cancel: Option<CancellationToken>,
    presentation: Option<axum::routing::MethodRouter<Arc<ServerState>>>,
    extra_routes: Vec<(String, axum::routing::MethodRouter<Arc<ServerState>>)>,
    connected: bool,
}

impl UpnpServer {
    /// Crée le serveur depuis une description de root device et les SCPD de
    /// ses services, indexées par la partie finale de leur id.
    pub fn new(
        cfg: Config,
        mut root_desc: desc::RootDevice,
        svc_descs: desc::ServiceMap,
    ) -> Result<Self, ServerError> {
        info!("creating UPnP server ...");

        // les descriptions doivent être irréprochables avant toute
        // construction
        let mut findings = root_desc.validate();
        for svc in svc_descs.values() {
            findings.extend(svc.validate());
        }
        if !findings.is_empty() {
            return Err(ServerError::InvalidDescription(findings));
        }

        // les URLs de services pointent vers nos endpoints ; la réécriture
        // précède tout calcul d'empreinte pour que les empreintes restent
        // stables d'un démarrage à l'autre
        set_desc_paths(&mut root_desc.device);

        let (change_tx, change_rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let (tree, services) = model::build(&root_desc, &svc_descs, change_tx)?;

        let boot_id = Arc::new(BootId::new());
        let config_id = Arc::new(ConfigId::new());

        let server_string = server_string(&cfg);

        // relecture du statut : compteurs, dérive de configuration,
        // ré-hydratation des variables, variables locales
        let locals = apply_status(&cfg, &root_desc, &services, &boot_id, &config_id);

        let evt = Arc::new(Eventing::new(&cfg.interfaces, Arc::clone(&boot_id))?);

        // le port réel doit être connu avant de créer les serveurs SSDP
        let listener = std::net::TcpListener::bind(("0.0.0.0", cfg.port))?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let (errs_tx, errs_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(ServerState {
            root_desc,
            tree,
            services,
            boot_id,
            config_id,
            evt,
            soap_handlers: RwLock::new(HashMap::new()),
            locals: Mutex::new(locals),
            server_string,
            errs: errs_tx,
            cfg,
        });

        let ssdp = create_ssdp_servers(&inner, port)?;

        info!("UPnP server created");

        Ok(Self {
            inner,
            ssdp,
            listener: Some(listener),
            change_rx: Some(change_rx),
            errs_rx: Some(errs_rx),
            evt_cancel: None,
            presentation: None,
            extra_routes: Vec::new(),
            connected: false,
        })
    }

    /// Valeur courante de BOOTID.UPNP.ORG.
    pub fn boot_id(&self) -> u32 {
        self.inner.boot_id.val()
    }

    /// Valeur courante de CONFIGID.UPNP.ORG.
    pub fn config_id(&self) -> u32 {
        self.inner.config_id.val()
    }

    /// Chaîne SERVER : `<OS>/<version> UPnP/2.0 <produit>/<version>`.
    pub fn server_string(&self) -> &str {
        &self.inner.server_string
    }

    /// Variable d'état `name` du service `svc_id`.
    pub fn state_variable(&self, svc_id: &str, name: &str) -> Option<Arc<StateVariable>> {
        self.inner
            .services
            .get(svc_id)
            .and_then(|svc| svc.state_var(name).cloned())
    }

    /// Valeur d'une variable locale persistée.
    pub fn local(&self, key: &str) -> Option<String> {
        self.inner.locals.lock().unwrap().get(key).cloned()
    }

    /// Pose une variable locale persistée.
    pub fn set_local(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner
            .locals
            .lock()
            .unwrap()
            .insert(key.into(), value.into());
    }

    /// Enregistre une route HTTP supplémentaire.
    pub fn http_handle_fn(
        &mut self,
        pattern: &str,
        handler: axum::routing::MethodRouter<Arc<ServerState>>,
    ) {
        info!("set handle func for pattern '{}'", pattern);
        self.extra_routes.push((pattern.to_string(), handler));
    }

    /// Enregistre le handler de l'URL de présentation du root device.
    pub fn presentation_handle_fn(&mut self, handler: axum::routing::MethodRouter<Arc<ServerState>>) {
        info!(
            "set handle func for presentation URL '{}'",
            self.inner.root_desc.device.presentation_url
        );
        self.presentation = Some(handler);
    }

    /// Enregistre le handler SOAP d'un couple (service, action).
    pub fn soap_handle_fn<F, Fut>(&self, svc_id: &str, action: &str, handler: F)
    where
        F: Fn(SoapArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SoapRespArgs, SoapError>> + Send + 'static,
    {
        let handler: SoapHandler = Arc::new(move |args| Box::pin(handler(args)));
        self.inner
            .soap_handlers
            .write()
            .unwrap()
            .insert(format!("{}#{}", svc_id, action), handler);
    }

    /// Canal des erreurs asynchrones fatales. À consommer une seule fois.
    pub fn errors(&mut self) -> Option<mpsc::UnboundedReceiver<ServerError>> {
        self.errs_rx.take()
    }

    /// Démarre la découverte SSDP et l'eventing.
    pub async fn connect(&mut self) -> Result<(), ServerError> {
        if self.connected {
            info!("tried to connect though server is already connected");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        self.inner.evt.run(cancel.clone());
        self.evt_cancel = Some(cancel);

        for ssdp in &mut self.ssdp {
            // une interface qui refuse le multicast n'empêche pas les autres
            // de servir la découverte
            if let Err(e) = ssdp.connect() {
                warn!(
                    "cannot connect SSDP server on interface '{}': {}",
                    ssdp.interface_name(),
                    e
                );
            }
        }

        // la génération de session augmente à chaque connexion, comme
        // l'exige l'UPnP Device Architecture 2.0
        self.inner.boot_id.incr();

        // annonce initiale des variables multicastées
        for svc in self.inner.services.values() {
            for sv in svc.state_vars() {
                sv.send_event();
            }
        }

        self.connected = true;
        info!("✅ UPnP server connected");
        Ok(())
    }

    /// Arrête la découverte SSDP (avec byebye) et l'eventing.
    pub async fn disconnect(&mut self) {
        if !self.connected {
            info!("tried to disconnect though server is not connected");
            return;
        }

        if let Some(cancel) = self.evt_cancel.take() {
            cancel.cancel();
        }
        self.inner.evt.stop().await;

        for ssdp in &mut self.ssdp {
            ssdp.disconnect().await;
        }

        self.connected = false;
        info!("👋 UPnP server disconnected");
    }

    /// Fait tourner le serveur jusqu'à l'annulation du token.
    ///
    /// Séquence d'arrêt : l'eventing cesse (les changements en attente sont
    /// abandonnés), les serveurs SSDP émettent leur byebye, le serveur HTTP
    /// n'accepte plus de connexions (les requêtes en vol se terminent), les
    /// abonnements sont résiliés, le statut est persisté.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::from_std(
            self.listener
                .take()
                .ok_or_else(|| std::io::Error::other("server already ran"))?,
        )?;
        info!("HTTP server listening on {}", listener.local_addr()?);

        let router = handlers::router(
            Arc::clone(&self.inner),
            self.presentation.take(),
            std::mem::take(&mut self.extra_routes),
        );

        // le listener de changements vit aussi longtemps que le serveur,
        // même à travers les phases déconnectées
        if let Some(rx) = self.change_rx.take() {
            self.inner.evt.listen(rx, cancel.child_token());
        }

        let http_cancel = cancel.clone();
        let errs = self.inner.errs.clone();
        let http = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { http_cancel.cancelled().await })
                .await;
            if let Err(e) = served {
                error!("HTTP serve: {}", e);
                let _ = errs.send(ServerError::Io(e));
            }
        });

        self.connect().await?;

        info!("running ...");
        cancel.cancelled().await;
        info!("received cancel event");

        self.disconnect().await;
        self.inner.evt.stop_listener().await;
        let _ = http.await;
        self.inner.evt.remove_all_subs();

        if let Err(e) = self.write_status() {
            let _ = self.inner.errs.send(ServerError::StatusWrite(e));
        }

        Ok(())
    }

    /// Persiste le statut courant : compteurs, empreintes, variables.
    pub fn write_status(&self) -> std::io::Result<()> {
        let mut st = Status {
            boot_id: self.inner.boot_id.val(),
            config_id: self.inner.config_id.val(),
            local_vars: self.inner.locals.lock().unwrap().clone(),
            ..Default::default()
        };

        if let Ok(hash) = self.inner.root_desc.content_hash() {
            st.file_hashes.insert(ROOT_HASH_KEY.to_string(), hash);
        }
        for (id, svc) in &self.inner.services {
            if let Ok(hash) = svc.desc().content_hash() {
                st.file_hashes
                    .insert(format!("{}{}", SERVICE_HASH_PREFIX, id), hash);
            }
        }

        for (id, svc) in &self.inner.services {
            let mut vars = HashMap::new();
            for sv in svc.state_vars() {
                // les variables de typage d'argument n'ont pas d'état propre
                if status::is_arg_type_var(sv.name()) {
                    continue;
                }
                vars.insert(sv.name().to_string(), sv.value_string());
            }
            st.state_vars.insert(id.clone(), vars);
        }

        st.write(&self.inner.cfg.status_file)
    }
}

/// Réécrit les URLs des références de services vers les endpoints du
/// serveur, récursivement sur les devices embarqués.
fn set_desc_paths(dvc: &mut desc::Device) {
    for svc in &mut dvc.services {
        let tail = svc.id_tail().to_string();
        svc.scpd_url = format!("{}{}.xml", SERVICE_DESC_PATH, tail);
        svc.control_url = format!("{}{}", SERVICE_CONTROL_PATH, tail);
        svc.event_sub_url = format!("{}{}", SERVICE_EVENT_SUB_PATH, tail);
    }
    for sub in &mut dvc.devices {
        set_desc_paths(sub);
    }
}

/// Assemble la chaîne SERVER :
/// `<OS>/<version OS> UPnP/2.0[ <produit>[/<version>]]`.
fn server_string(cfg: &Config) -> String {
    let info = os_info::get();
    let mut s = format!("{}/{} UPnP/2.0", info.os_type(), info.version());

    if !cfg.product_name.is_empty() && !cfg.product_version.is_empty() {
        s.push_str(&format!(" {}/{}", cfg.product_name, cfg.product_version));
    } else if !cfg.product_name.is_empty() {
        s.push_str(&format!(" {}", cfg.product_name));
    } else if !cfg.product_version.is_empty() {
        s.push_str(&format!(" {}", cfg.product_version));
    }

    s
}

/// Relit le statut persisté : compteurs, dérive de configuration,
/// ré-hydratation. Retourne les variables locales relues.
///
/// Une erreur de lecture n'est pas fatale : le serveur repart de compteurs
/// à zéro.
fn apply_status(
    cfg: &Config,
    root_desc: &desc::RootDevice,
    services: &ServiceMap,
    boot_id: &BootId,
    config_id: &ConfigId,
) -> HashMap<String, String> {
    let st = match Status::read(&cfg.status_file) {
        Ok(st) => st,
        Err(e) => {
            warn!("couldn't read status file: {}", e);
            Status::default()
        }
    };

    boot_id.set(st.boot_id);
    config_id.set(st.config_id);

    if config_drifted(&st, root_desc, services) {
        info!("description content changed: increasing ConfigID");
        config_id.incr();
    }

    // ré-hydratation des variables d'état, sans notification
    for (svc_id, vars) in &st.state_vars {
        let Some(svc) = services.get(svc_id) else {
            continue;
        };
        for (name, value) in vars {
            if status::is_arg_type_var(name) {
                continue;
            }
            let Some(sv) = svc.state_var(name) else {
                continue;
            };
            if let Err(e) = sv.init_from_string(value) {
                warn!("couldn't restore state variable '{}': {}", name, e);
            }
        }
    }

    st.local_vars
}

/// Compare les empreintes persistées au contenu courant des descriptions.
fn config_drifted(
    st: &Status,
    root_desc: &desc::RootDevice,
    services: &ServiceMap,
) -> bool {
    // l'ensemble des services a changé ?
    if st.file_hashes.len() != services.len() + 1 {
        return true;
    }

    match (
        st.file_hashes.get(ROOT_HASH_KEY),
        root_desc.content_hash(),
    ) {
        (Some(persisted), Ok(current)) if *persisted == current => {}
        _ => return true,
    }

    for (id, svc) in services {
        let key = format!("{}{}", SERVICE_HASH_PREFIX, id);
        match (st.file_hashes.get(&key), svc.desc().content_hash()) {
            (Some(persisted), Ok(current)) if *persisted == current => {}
            _ => return true,
        }
    }

    false
}

/// Crée un serveur SSDP par interface utilisable. Échoue si aucune
/// interface ne convient.
fn create_ssdp_servers(inner: &Arc<ServerState>, port: u16) -> Result<Vec<SsdpServer>, ServerError> {
    let interfaces = network::interfaces(&inner.cfg.interfaces)?;
    if interfaces.is_empty() {
        return Err(ServerError::NoInterface);
    }

    let data = Arc::new(DiscoveryData {
        location: format!("http://{{{{ADDRESS}}}}{}", DEVICE_DESC_PATH),
        server: inner.server_string.clone(),
        max_age: inner.cfg.max_age,
        assets: ssdp::device_assets(&inner.tree, &inner.services),
    });
    let index = Arc::new(SearchIndex::build(&inner.tree, &inner.services));

    let servers = interfaces
        .into_iter()
        .map(|iface| {
            SsdpServer::new(
                Arc::clone(&data),
                Arc::clone(&index),
                Arc::clone(&inner.boot_id),
                Arc::clone(&inner.config_id),
                iface,
                port,
            )
        })
        .collect();

    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::fixtures;

    fn config(dir: &std::path::Path) -> Config {
        Config {
            status_file: dir.join("status.json").to_string_lossy().into_owned(),
            product_name: "demo".to_string(),
            product_version: "1.0".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_server_string_shape() {
        let s = server_string(&Config {
            product_name: "demo".to_string(),
            product_version: "2.1".to_string(),
            ..Default::default()
        });
        assert!(s.contains(" UPnP/2.0 demo/2.1"));

        let s = server_string(&Config::default());
        assert!(s.ends_with(" UPnP/2.0"));
    }

    #[test]
    fn test_set_desc_paths() {
        let mut root = fixtures::root_device();
        set_desc_paths(&mut root.device);
        let svc = &root.device.services[0];
        assert_eq!(svc.scpd_url, "/services/desc/CD.xml");
        assert_eq!(svc.control_url, "/services/control/CD");
        assert_eq!(svc.event_sub_url, "/services/eventSub/CD");
    }

    #[test]
    fn test_invalid_description_aborts_creation() {
        let dir = tempfile::tempdir().unwrap();
        let mut root = fixtures::root_device();
        root.device.udn = "uuid:not-a-uuid".to_string();
        assert!(matches!(
            UpnpServer::new(config(dir.path()), root, fixtures::service_map()),
            Err(ServerError::InvalidDescription(_))
        ));
    }

    #[tokio::test]
    async fn test_boot_id_and_config_id_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        // premier démarrage : snapshot vide, la dérive pousse le ConfigID
        // à 1, le BootID passe à 1 à la connexion
        let mut server =
            UpnpServer::new(cfg.clone(), fixtures::root_device(), fixtures::service_map())
                .unwrap();
        server.connect().await.unwrap();
        assert_eq!(server.boot_id(), 1);
        let config_id = server.config_id();
        server.write_status().unwrap();
        drop(server);

        // redémarrage sans changement : BootID avance, ConfigID stable
        let mut server =
            UpnpServer::new(cfg.clone(), fixtures::root_device(), fixtures::service_map())
                .unwrap();
        server.connect().await.unwrap();
        assert_eq!(server.boot_id(), 2);
        assert_eq!(server.config_id(), config_id);
        server.write_status().unwrap();
        drop(server);

        // une description modifiée fait avancer le ConfigID
        let mut root = fixtures::root_device();
        root.device.friendly_name = "Renamed".to_string();
        let server = UpnpServer::new(cfg, root, fixtures::service_map()).unwrap();
        assert_eq!(server.config_id(), config_id + 1);
    }

    #[tokio::test]
    async fn test_state_variable_rehydration() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let server =
            UpnpServer::new(cfg.clone(), fixtures::root_device(), fixtures::service_map())
                .unwrap();
        let counter = server.state_variable("CD", "Counter").unwrap();
        counter.set(StateValue::UI4(7)).unwrap();
        server.set_local("answer", "42");
        server.write_status().unwrap();
        drop(server);

        let server =
            UpnpServer::new(cfg, fixtures::root_device(), fixtures::service_map()).unwrap();
        assert_eq!(
            server.state_variable("CD", "Counter").unwrap().value_string(),
            "7"
        );
        assert_eq!(server.local("answer").as_deref(), Some("42"));
    }

    #[test]
    fn test_arg_type_vars_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let server =
            UpnpServer::new(cfg.clone(), fixtures::root_device(), fixtures::service_map())
                .unwrap();
        server.write_status().unwrap();

        let st = Status::read(&cfg.status_file).unwrap();
        assert!(st.state_vars["CD"].contains_key("Counter"));
        assert!(!st.state_vars["CD"].contains_key("A_ARG_TYPE_Filter"));
    }
}
