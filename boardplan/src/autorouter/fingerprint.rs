//! Routing request fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;

use crate::autorouter::config::AutorouterConfig;
use crate::units::Distance;

#[derive(Serialize)]
struct FingerprintInput<'a> {
    topology: &'a str,
    config: &'a AutorouterConfig,
    trace_clearance: Distance,
}

/// SHA-256 hex digest of the circuit topology, the resolved config and the
/// effective clearance. The config's seed cache is excluded, and so are the
/// server fields when `algorithmFn` overrides them.
pub fn fingerprint(
    topology_id: &str,
    config: &AutorouterConfig,
) -> Result<String, serde_json::Error> {
    let mut hashed = Cow::Borrowed(config);
    if config.algorithm_fn.is_some() {
        let routed = hashed.to_mut();
        routed.server_url = None;
        routed.server_mode = None;
    }
    let bytes = serde_json::to_vec(&FingerprintInput {
        topology: topology_id,
        config: &*hashed,
        trace_clearance: config.trace_clearance,
    })?;
    Ok(sha256_hex(&bytes))
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PcbRouteCache, ServerMode};

    fn config() -> AutorouterConfig {
        AutorouterConfig::resolve(None, Distance::from_mm(0.15))
    }

    #[test]
    fn test_stable_and_hex() {
        let a = fingerprint("topo", &config()).unwrap();
        let b = fingerprint("topo", &config()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_inputs_change_fingerprint() {
        let base = fingerprint("topo", &config()).unwrap();
        assert_ne!(base, fingerprint("other", &config()).unwrap());

        let mut changed = config();
        changed.server_mode = Some(ServerMode::SolveEndpoint);
        assert_ne!(base, fingerprint("topo", &changed).unwrap());

        let mut wider = config();
        wider.trace_clearance = Distance::from_mm(0.2);
        assert_ne!(base, fingerprint("topo", &wider).unwrap());
    }

    #[test]
    fn test_server_fields_ignored_under_algorithm() {
        let mut plain = config();
        plain.algorithm_fn = Some("maze".into());
        let mut with_server = plain.clone();
        with_server.server_url = Some("http://router".into());
        with_server.server_mode = Some(ServerMode::Job);
        assert_eq!(
            fingerprint("topo", &plain).unwrap(),
            fingerprint("topo", &with_server).unwrap()
        );

        let mut other = plain.clone();
        other.algorithm_fn = Some("astar".into());
        assert_ne!(
            fingerprint("topo", &plain).unwrap(),
            fingerprint("topo", &other).unwrap()
        );
    }

    #[test]
    fn test_seed_cache_is_excluded() {
        let mut seeded = config();
        seeded.cache = Some(PcbRouteCache {
            pcb_traces: vec![],
            cache_key: "old".into(),
        });
        assert_eq!(
            fingerprint("topo", &config()).unwrap(),
            fingerprint("topo", &seeded).unwrap()
        );
    }
}
