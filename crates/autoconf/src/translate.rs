//! Translation of the servers' configuration fragment into the local schema.

use autoconf_core::{
    AclFragment, AclOverlay, AclTokensOverlay, ConfigFragment, ConfigOverlay, GossipFragment,
    GossipOverlay, TlsFragment, TlsOverlay,
};

/// Map a configuration fragment from an auto-config response onto the
/// overlay the loader merges over the local files.
///
/// Empty strings and absent sections are left unset so they do not override
/// local values.
#[must_use]
pub fn translate_config(fragment: &ConfigFragment) -> ConfigOverlay {
    ConfigOverlay {
        datacenter: non_empty(&fragment.datacenter),
        primary_datacenter: non_empty(&fragment.primary_datacenter),
        node_name: non_empty(&fragment.node_name),
        segment_name: non_empty(&fragment.segment_name),
        acl: fragment.acl.as_ref().map(translate_acl),
        gossip: fragment.gossip.as_ref().and_then(translate_gossip),
        tls: fragment.tls.as_ref().map(translate_tls),
    }
}

fn translate_acl(acl: &AclFragment) -> AclOverlay {
    AclOverlay {
        enabled: Some(acl.enabled),
        policy_ttl: non_empty(&acl.policy_ttl),
        role_ttl: non_empty(&acl.role_ttl),
        token_ttl: non_empty(&acl.token_ttl),
        down_policy: non_empty(&acl.down_policy),
        default_policy: non_empty(&acl.default_policy),
        enable_key_list_policy: Some(acl.enable_key_list_policy),
        tokens: acl.tokens.as_ref().map(|tokens| AclTokensOverlay {
            agent: non_empty(&tokens.agent),
            default: non_empty(&tokens.default),
        }),
    }
}

fn translate_gossip(gossip: &GossipFragment) -> Option<GossipOverlay> {
    let encryption = gossip.encryption.as_ref()?;
    Some(GossipOverlay {
        encrypt: non_empty(&encryption.key),
        encrypt_verify_incoming: Some(encryption.verify_incoming),
        encrypt_verify_outgoing: Some(encryption.verify_outgoing),
    })
}

fn translate_tls(tls: &TlsFragment) -> TlsOverlay {
    TlsOverlay {
        verify_outgoing: Some(tls.verify_outgoing),
        verify_server_hostname: Some(tls.verify_server_hostname),
        cipher_suites: non_empty(&tls.cipher_suites),
        min_version: non_empty(&tls.min_version),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
