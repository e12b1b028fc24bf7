use std::sync::Arc;

use nodeforge::generator::{resolve_nodes, DedupKey};
use nodeforge::models::{Credential, Protocol, Transport};
use nodeforge::parser::subparser::extract_from_body;
use nodeforge::parser::{order_by_links, ParseCache, ParserPool};
use nodeforge::utils::base64::{base64_encode, url_safe_base64_encode};
use nodeforge::{parse_link, ParseError};

fn vmess_json(drop_key: Option<&str>) -> String {
    let mut json = serde_json::json!({
        "v": "2",
        "ps": "vmess node",
        "add": "v.example.com",
        "port": 443,
        "id": "b831381d-6324-4d53-ad4f-8cda48b30811",
        "aid": 0,
        "net": "grpc",
        "path": "svc",
        "tls": "tls",
        "sni": "sni.example.com"
    });
    if let Some(key) = drop_key {
        json.as_object_mut().unwrap().remove(key);
    }
    json.to_string()
}

#[cfg(test)]
mod parser_tests {
    use super::*;

    #[test]
    fn test_vless_and_trojan_fields() {
        let vless = parse_link(
            "vless://b831381d-6324-4d53-ad4f-8cda48b30811@v.example.com:8443?type=ws&path=%2Fws&security=tls#VL",
        )
        .unwrap();
        assert_eq!(vless.protocol(), Protocol::Vless);
        assert_eq!(vless.server(), "v.example.com");
        assert_eq!(vless.port(), 8443);
        assert_eq!(
            vless.credential(),
            &Credential::Uuid("b831381d-6324-4d53-ad4f-8cda48b30811".to_string())
        );
        assert!(matches!(vless.transport(), Transport::Ws(_)));

        let trojan = parse_link("trojan://secret@t.example.com:443?peer=p.example.com#TR").unwrap();
        assert_eq!(trojan.credential().password(), Some("secret"));
        assert_eq!(
            trojan.tls_options().and_then(|t| t.sni.as_deref()),
            Some("p.example.com")
        );
    }

    #[test]
    fn test_vmess_required_keys() {
        let link = format!("vmess://{}", base64_encode(&vmess_json(None)));
        let node = parse_link(&link).unwrap();
        assert_eq!(node.server(), "v.example.com");
        assert_eq!(node.port(), 443);
        assert!(node.tls());

        for key in ["add", "port", "id"] {
            let link = format!("vmess://{}", base64_encode(&vmess_json(Some(key))));
            assert!(
                matches!(parse_link(&link), Err(ParseError::MalformedPayload(_))),
                "missing {} should be malformed",
                key
            );
        }
    }

    #[test]
    fn test_url_safe_base64_decodes_the_same() {
        let json = vmess_json(None);
        let standard = parse_link(&format!("vmess://{}", base64_encode(&json))).unwrap();
        let url_safe = parse_link(&format!("vmess://{}", url_safe_base64_encode(&json))).unwrap();
        assert_eq!(standard, url_safe);
    }

    #[test]
    fn test_rejections_are_typed() {
        assert!(matches!(
            parse_link("http://example.com"),
            Err(ParseError::UnsupportedProtocol(_))
        ));
        assert!(matches!(
            parse_link("trojan://@t.example.com:443"),
            Err(ParseError::MissingCredential(_))
        ));
        assert!(matches!(parse_link(""), Err(ParseError::MalformedPayload(_))));
    }

    #[test]
    fn test_pool_batch_over_base64_subscription() {
        let body = base64_encode(
            &[
                "trojan://a@one.example.com:443#One",
                "hy2://pw@two.example.com:443#Two",
                "ss://bm90LWJhc2U2NA@three.example.com:8388#Three",
                "trojan://a@one.example.com:443#One",
            ]
            .join("\n"),
        );
        let links = extract_from_body(&body);
        assert_eq!(links.len(), 3);

        let pool = ParserPool::new(3, Arc::new(ParseCache::default()));
        let outcomes = order_by_links(&links, pool.parse_many(&links));
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert_eq!(
            outcomes[1].node.as_ref().map(|n| n.protocol()),
            Some(Protocol::Hysteria2)
        );
        assert!(outcomes[2].error.is_some());
    }

    #[test]
    fn test_dedup_is_idempotent_and_renames() {
        let links = [
            "trojan://a@one.example.com:443#A",
            "trojan://b@two.example.com:443#A",
            "trojan://c@three.example.com:443#A",
            "trojan://a@one.example.com:443#Other name",
        ];
        let nodes: Vec<_> = links.iter().map(|l| parse_link(l).unwrap()).collect();
        let once = resolve_nodes(nodes);
        let names: Vec<&str> = once.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["A", "A-1", "A-2"]);

        let twice = resolve_nodes(once.clone());
        assert_eq!(once, twice);
        assert_ne!(DedupKey::of(&once[0]), DedupKey::of(&once[1]));
    }
}
