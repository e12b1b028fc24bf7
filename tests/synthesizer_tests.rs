use nodeforge::generator::yaml::clash::{ClashProxy, ClashProxyCommon, ClashProxyGroup};
use nodeforge::generator::{proxy_to_clash, synthesize, ClashOptions, SynthesisError};
use nodeforge::models::{Credential, Protocol, ProxyNode};
use nodeforge::parse_link;

fn sample_nodes() -> Vec<ProxyNode> {
    [
        "ss://YWVzLTI1Ni1nY206c2VjcmV0@hk.example.com:8388#HK-01",
        "vless://b831381d-6324-4d53-ad4f-8cda48b30811@jp.example.com:443?security=reality&pbk=KEY&sid=ab&flow=xtls-rprx-vision&sni=www.example.com#JP-01",
        "hysteria2://pw@us.example.com:443?obfs=salamander&obfs-password=x#US-01",
    ]
    .iter()
    .map(|l| parse_link(l).unwrap())
    .collect()
}

#[cfg(test)]
mod synthesizer_tests {
    use super::*;

    #[test]
    fn test_document_layout() {
        let options = ClashOptions::default();
        let doc = synthesize(&sample_nodes(), &options).unwrap();

        assert_eq!(doc.port, Some(7890));
        assert_eq!(doc.socks_port, Some(7891));
        assert_eq!(doc.allow_lan, Some(true));
        assert_eq!(doc.external_controller.as_deref(), Some("127.0.0.1:9090"));
        assert_eq!(doc.proxies.len(), 3);

        let kinds: Vec<&str> = doc.proxy_groups.iter().map(ClashProxyGroup::kind).collect();
        assert_eq!(kinds, vec!["select", "url-test", "fallback"]);
        assert_eq!(
            doc.proxy_groups[0].proxies(),
            &["Auto", "DIRECT", "HK-01", "JP-01", "US-01"]
        );
        assert_eq!(doc.proxy_groups[1].proxies(), &["HK-01", "JP-01", "US-01"]);

        assert_eq!(doc.rules.first().map(String::as_str), Some("DOMAIN-SUFFIX,local,DIRECT"));
        assert!(doc.rules.iter().any(|r| r == "IP-CIDR,192.168.0.0/16,DIRECT"));
        assert!(doc.rules.contains(&"GEOIP,CN,DIRECT".to_string()));
        assert_eq!(doc.rules.last().map(String::as_str), Some("MATCH,Proxy"));
    }

    #[test]
    fn test_protocol_specific_fields() {
        let doc = synthesize(&sample_nodes(), &ClashOptions::default()).unwrap();
        match &doc.proxies[1] {
            ClashProxy::Vless {
                uuid,
                flow,
                reality_opts,
                common,
                ..
            } => {
                assert_eq!(uuid, "b831381d-6324-4d53-ad4f-8cda48b30811");
                assert_eq!(flow.as_deref(), Some("xtls-rprx-vision"));
                assert_eq!(
                    reality_opts.as_ref().map(|r| r.public_key.as_str()),
                    Some("KEY")
                );
                assert_eq!(common.tls, Some(true));
            }
            other => panic!("expected vless, got {:?}", other),
        }

        let yaml = proxy_to_clash(&sample_nodes(), &ClashOptions::default()).unwrap();
        assert!(yaml.contains("type: ss"));
        assert!(yaml.contains("cipher: aes-256-gcm"));
        assert!(yaml.contains("type: hysteria2"));
        assert!(yaml.contains("obfs-password: x"));
        assert!(!yaml.contains("uuid: null"));
    }

    #[test]
    fn test_custom_groups_and_listener() {
        let mut options = ClashOptions::default();
        options.select_group = "Select".into();
        options.port = 7990;
        options.geoip_direct = vec![];
        let doc = synthesize(&sample_nodes(), &options).unwrap();
        assert_eq!(doc.port, Some(7990));
        assert_eq!(doc.proxy_groups[0].name(), "Select");
        assert_eq!(doc.rules.last().map(String::as_str), Some("MATCH,Select"));
        assert!(!doc.rules.iter().any(|r| r.starts_with("GEOIP")));
        assert_eq!(doc.proxies[0].name(), "HK-01");
    }

    #[test]
    fn test_empty_and_colliding_names_fail() {
        assert!(matches!(
            synthesize(&[], &ClashOptions::default()),
            Err(SynthesisError::EmptyNodeList)
        ));

        let node = ProxyNode::builder(Protocol::Trojan, "a.example.com", 443)
            .name("Auto")
            .credential(Credential::Password("pw".into()))
            .build();
        assert!(matches!(
            synthesize(&[node], &ClashOptions::default()),
            Err(SynthesisError::DuplicateName(name)) if name == "Auto"
        ));
    }
}
