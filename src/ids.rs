//! Compteurs d'identité UPnP : BOOTID.UPNP.ORG et CONFIGID.UPNP.ORG.
//!
//! Le BootID est la génération de session du device : il augmente à chaque
//! démarrage. Le ConfigID est la génération du contenu des descriptions : il
//! augmente quand une description change entre deux démarrages.
//!
//! Écrivain unique (démarrage/arrêt), lecteurs multiples : les lecteurs
//! prennent la valeur courante atomiquement.

use std::sync::atomic::{AtomicU32, Ordering};

/// Valeur maximale de CONFIGID.UPNP.ORG selon l'UPnP Device Architecture 2.0.
pub const MAX_CONFIG_ID: u32 = 16_777_215;

/// BOOTID.UPNP.ORG.
#[derive(Debug, Default)]
pub struct BootId {
    id: AtomicU32,
}

impl BootId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valeur courante.
    pub fn val(&self) -> u32 {
        self.id.load(Ordering::Acquire)
    }

    /// Incrémente la valeur courante.
    pub fn incr(&self) {
        self.id.fetch_add(1, Ordering::AcqRel);
    }

    /// Positionne la valeur courante (relecture du statut persisté).
    pub fn set(&self, v: u32) {
        self.id.store(v, Ordering::Release);
    }
}

/// CONFIGID.UPNP.ORG, plafonné à [`MAX_CONFIG_ID`].
#[derive(Debug, Default)]
pub struct ConfigId {
    id: AtomicU32,
}

impl ConfigId {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valeur courante.
    pub fn val(&self) -> u32 {
        self.id.load(Ordering::Acquire)
    }

    /// Incrémente la valeur courante, en rebouclant à zéro au plafond.
    pub fn incr(&self) {
        let _ = self
            .id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                Some(if v >= MAX_CONFIG_ID { 0 } else { v + 1 })
            });
    }

    /// Positionne la valeur courante (relecture du statut persisté).
    pub fn set(&self, v: u32) {
        self.id.store(v, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_id_steps() {
        let id = BootId::new();
        assert_eq!(id.val(), 0);
        id.incr();
        assert_eq!(id.val(), 1);
        id.set(41);
        id.incr();
        assert_eq!(id.val(), 42);
    }

    #[test]
    fn test_config_id_wraps_at_cap() {
        let id = ConfigId::new();
        id.set(MAX_CONFIG_ID - 1);
        id.incr();
        assert_eq!(id.val(), MAX_CONFIG_ID);
        id.incr();
        assert_eq!(id.val(), 0);
    }
}
