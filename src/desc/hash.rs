//! Empreintes des descriptions pour la détection de dérive de configuration.
//!
//! L'empreinte est un FNV-1a 64 bits de la forme XML sérialisée, calculée
//! avec l'attribut `configId` remis à zéro : le ConfigID est sous le contrôle
//! du serveur et ne doit pas fausser la comparaison.

use crate::desc::{DescError, RootDevice, Service};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a 64 bits.
pub(crate) fn fnv1a(data: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for b in data {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl RootDevice {
    /// Empreinte du contenu, indépendante du ConfigID courant.
    pub fn content_hash(&self) -> Result<u64, DescError> {
        let mut cleared = self.clone();
        cleared.config_id = 0;
        Ok(fnv1a(cleared.to_xml()?.as_bytes()))
    }
}

impl Service {
    /// Empreinte du contenu, indépendante du ConfigID courant.
    pub fn content_hash(&self) -> Result<u64, DescError> {
        let mut cleared = self.clone();
        cleared.config_id = 0;
        Ok(fnv1a(cleared.to_xml()?.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::fixtures;

    #[test]
    fn test_fnv1a_reference_vectors() {
        // vecteurs connus de FNV-1a 64 bits
        assert_eq!(fnv1a(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_hash_ignores_config_id() {
        let mut a = fixtures::root_device();
        let mut b = fixtures::root_device();
        a.config_id = 1;
        b.config_id = 999;
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
    }

    #[test]
    fn test_hash_tracks_content() {
        let a = fixtures::root_device();
        let mut b = fixtures::root_device();
        b.device.friendly_name = "Renamed".to_string();
        assert_ne!(a.content_hash().unwrap(), b.content_hash().unwrap());
    }
}
