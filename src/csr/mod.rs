//! Certificate signing request decoding and redaction
//!
//! A CSR resource carries its PEM request base64-encoded at `spec.request`.
//! Decoding replaces that field with a readable summary (subject plus any
//! subject alternative names) and blanks the issued certificate, in memory
//! only. Diagnostic tooling must never fail a whole report over one
//! malformed sub-document, so any decode failure is logged and leaves the
//! resource untouched as a degraded raw view.

use std::net::Ipv4Addr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;

use crate::capture::resource::Resource;

/// Placeholder written over `status.certificate` once the request decodes.
pub const CERTIFICATE_REDACTION: &str = "<issued certificate redacted>";

const PEM_LABEL: &str = "CERTIFICATE REQUEST";

/// Why an embedded certificate request could not be decoded.
#[derive(Debug, Error)]
pub enum CsrDecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid PEM: {0}")]
    Pem(String),
    #[error("unexpected PEM label {0:?}")]
    UnexpectedLabel(String),
    #[error("invalid certification request: {0}")]
    Der(String),
}

/// Decode `spec.request` in place and redact the issued certificate.
///
/// On any decode failure the resource is left exactly as loaded, so the
/// report still renders the raw, un-redacted data.
pub fn decode_and_redact(resource: &mut Resource) {
    let Some(request) = resource.get(&["spec", "request"]).and_then(Value::as_str) else {
        tracing::debug!("csr {} has no spec.request", resource.name());
        return;
    };
    let decoded = match decode_request(request) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::error!(
                "unable to decode certificate request for {}: {}",
                resource.name(),
                err
            );
            return;
        }
    };
    if let Some(spec) = resource
        .doc_mut()
        .get_mut("spec")
        .and_then(Value::as_mapping_mut)
    {
        spec.insert("request".into(), decoded);
    }
    if let Some(status) = resource
        .doc_mut()
        .get_mut("status")
        .and_then(Value::as_mapping_mut)
    {
        if status.contains_key("certificate") {
            status.insert("certificate".into(), CERTIFICATE_REDACTION.into());
        }
    }
}

/// Parse a base64-encoded PEM certificate request into its summary mapping:
/// `subject` as an RFC 4514-style distinguished name, and under
/// `extensions.subjectAlternativeName` the DNS names and IP addresses when
/// the extension is present. Without the extension the key is omitted
/// entirely.
pub fn decode_request(encoded: &str) -> Result<Value, CsrDecodeError> {
    let pem_bytes = STANDARD.decode(encoded.trim())?;
    let (_, pem) = parse_x509_pem(&pem_bytes).map_err(|err| CsrDecodeError::Pem(err.to_string()))?;
    if pem.label != PEM_LABEL {
        return Err(CsrDecodeError::UnexpectedLabel(pem.label.clone()));
    }
    let (_, csr) = X509CertificationRequest::from_der(&pem.contents)
        .map_err(|err| CsrDecodeError::Der(err.to_string()))?;

    let subject = csr.certification_request_info.subject.to_string();

    let mut extensions = Mapping::new();
    if let Some(requested) = csr.requested_extensions() {
        for extension in requested {
            let ParsedExtension::SubjectAlternativeName(san) = extension else {
                continue;
            };
            let mut dns_names = Vec::new();
            let mut ip_addresses = Vec::new();
            for general_name in &san.general_names {
                match general_name {
                    GeneralName::DNSName(dns) => dns_names.push(Value::from(*dns)),
                    GeneralName::IPAddress(octets) => match format_ip(octets) {
                        Some(ip) => ip_addresses.push(Value::from(ip)),
                        None => {
                            tracing::warn!("ignoring SAN IP address of {} bytes", octets.len())
                        }
                    },
                    other => tracing::debug!("ignoring SAN entry {:?}", other),
                }
            }
            let mut san_map = Mapping::new();
            san_map.insert("dnsNames".into(), Value::Sequence(dns_names));
            san_map.insert("ipAddresses".into(), Value::Sequence(ip_addresses));
            extensions.insert("subjectAlternativeName".into(), Value::Mapping(san_map));
        }
    }

    let mut decoded = Mapping::new();
    decoded.insert("subject".into(), subject.into());
    decoded.insert("extensions".into(), Value::Mapping(extensions));
    Ok(Value::Mapping(decoded))
}

/// Render a SAN IP address in expanded textual form. IPv6 addresses are
/// written with all four digits per group, never compressed.
fn format_ip(octets: &[u8]) -> Option<String> {
    match octets.len() {
        4 => Some(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]).to_string()),
        16 => {
            let groups: Vec<String> = octets
                .chunks(2)
                .map(|pair| format!("{:04x}", u16::from_be_bytes([pair[0], pair[1]])))
                .collect();
            Some(groups.join(":"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// CSR for system:node:worker-a with SAN DNS entries
    /// a.example.com and b.example.com.
    const SAN_CSR_PEM: &str = "-----BEGIN CERTIFICATE REQUEST-----
MIICtTCCAZ0CAQAwNjEVMBMGA1UECgwMc3lzdGVtOm5vZGVzMR0wGwYDVQQDDBRz
eXN0ZW06bm9kZTp3b3JrZXItYTCCASIwDQYJKoZIhvcNAQEBBQADggEPADCCAQoC
ggEBANbjZSMjj2KzlGYPfnoJN3MhG//w/+By6IUHCOsv7+A0qF/6JTwrWCoc/lga
v0ocIU+97R/FdSLN8qC6ubsgrBoEAqRk6FpZvU9YRpZTxbxJG32D7S+7CSaH6fdG
zMjpmXOCzcNXq32gEAQgzSNGaNY9rWGaCogkwrIPLQP0vcAqG/LeR7MG/Uqb1dQG
N03ez3y1rUzznnQaApF8Gt/pS1KQZHpop/Z9x5MjW3zVNtwHeCMnG4CC7t1Rk5df
TMlObZQRnakMGBnA/DcyM+XJQfGL0liKD1iXpE6wXHct41FOwcg0IKxHoyf+tgnX
38qNDkMoAP73Kf5iliIZjFVTIksCAwEAAaA6MDgGCSqGSIb3DQEJDjErMCkwJwYD
VR0RBCAwHoINYS5leGFtcGxlLmNvbYINYi5leGFtcGxlLmNvbTANBgkqhkiG9w0B
AQsFAAOCAQEAp7zBkuVvhgO7SjcCTaIGWNFQ5YX1xM9ans2McTEz4JHWupcBDNlg
r9GymZjtDnXg0pn1YbxOUgqpGJ1Gz2+El1spwJAsxtU9pYfDPwC1PR5Z2XrvB5LI
gESxNOevRRM8iN7ooVo7ncqvTPhv7SPW5onwOliT6RM6erwNiWLnhE0eOBe/NOEc
vCZOyYPSuEfCD+/1tafx6vAZhrw8gY6Fwf/FF5+bUx56wY2zJ9RyaH1EheEyBe9q
VLrcyz8YPvFWFHdcfEVBvadydSPRyhbCbrvrRHoLw6LlzYSTV24AbQ2AwTUBuIKW
1AyDDQRpUXjZ1vheB3oPm3prZGJu3d58Rw==
-----END CERTIFICATE REQUEST-----
";

    /// CSR for system:node:worker-b with no requested extensions.
    const PLAIN_CSR_PEM: &str = "-----BEGIN CERTIFICATE REQUEST-----
MIICezCCAWMCAQAwNjEVMBMGA1UECgwMc3lzdGVtOm5vZGVzMR0wGwYDVQQDDBRz
eXN0ZW06bm9kZTp3b3JrZXItYjCCASIwDQYJKoZIhvcNAQEBBQADggEPADCCAQoC
ggEBAMGEydakCLNKffIC8B09hWS/D2iJy7/+QdFw6FMXL3T4Gr3lr/dIai12Cr8i
4KOb308SmLAJNCVtwZTo/gtmjsLb0f89Jba8fzXrVqXsDyTfHou3nkvQW/s2ejw/
1g+eei2ylvYgkc/erTz3nzdOLKoV86y+EpVThkaC/X8vpJJD50T1jgdoVXtmmPqi
xioBgEgvOJu2eHqBfie6mZkHurVY8XoiGCf4oN8+vQVODTAQw0Q3WLgCCvAJktsp
Ywvy4icpKhDMr2Jzu9eW2+dj0IXhyrejpKjlyD4CZ45DrzDGaQ2nhTzZEnMKDDnL
hE5dSZLBsll+A7Zb/WahjOkFxYsCAwEAAaAAMA0GCSqGSIb3DQEBCwUAA4IBAQCY
BpI1Ilkdwi/4ndzfuXETz0dIfKBJN1sIa8u/7cltyd1ZwHhraC5muQEA8u0zB5xH
KLd5ZoCxrGZTfHYjOxU+DTbi16FQ/xz6ieu8s75ZKgMAWOTr2HGTCmN1t5P+DKAD
eovlIAFRPHBHfdRhKvwYC+3DnHzxbdF5MxhcDJbR9z58mEW4Yh601JtJii5xv0cK
K7uQKnndK1hWNywhnUsCXlJqbDYnfoG1C61b2teOJia6GnJSnOUYvCH6B1H6rSJ6
oFPO4JCdrfXugZgOGBdnbAEQMu7U3dZ2kYgY6Lqd0Q2Ij6/Q1jwLBlH0yQ5Xvf1F
L/MjDCbPpjqxkLnEhIE9
-----END CERTIFICATE REQUEST-----
";

    fn encode(pem: &str) -> String {
        STANDARD.encode(pem)
    }

    fn csr_resource(pem: &str, with_certificate: bool) -> Resource {
        let mut doc = format!(
            "metadata:\n  name: csr-1\nspec:\n  request: {}\n",
            encode(pem)
        );
        if with_certificate {
            doc.push_str("status:\n  certificate: aWdub3JlZA==\n");
        }
        Resource::parse(&doc).unwrap()
    }

    #[test]
    fn test_decode_request_with_san() {
        let decoded = decode_request(&encode(SAN_CSR_PEM)).unwrap();
        let subject = decoded.get("subject").and_then(Value::as_str).unwrap();
        assert!(subject.contains("CN=system:node:worker-a"));
        assert!(subject.contains("O=system:nodes"));

        let san = decoded
            .get("extensions")
            .and_then(|e| e.get("subjectAlternativeName"))
            .expect("SAN extension should decode");
        let dns: Vec<&str> = san
            .get("dnsNames")
            .and_then(Value::as_sequence)
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(dns, vec!["a.example.com", "b.example.com"]);
        let ips = san.get("ipAddresses").and_then(Value::as_sequence).unwrap();
        assert!(ips.is_empty());
    }

    #[test]
    fn test_decode_request_without_san_omits_key() {
        let decoded = decode_request(&encode(PLAIN_CSR_PEM)).unwrap();
        let subject = decoded.get("subject").and_then(Value::as_str).unwrap();
        assert!(subject.contains("CN=system:node:worker-b"));
        let extensions = decoded.get("extensions").and_then(Value::as_mapping).unwrap();
        assert!(!extensions.contains_key("subjectAlternativeName"));
    }

    #[test]
    fn test_decode_request_garbage() {
        assert!(matches!(
            decode_request("not even base64!"),
            Err(CsrDecodeError::Base64(_))
        ));
        // valid base64 of bytes that are not PEM
        let garbage = STANDARD.encode(b"garbage bytes where PEM is expected");
        assert!(decode_request(&garbage).is_err());
    }

    #[test]
    fn test_decode_and_redact() {
        let mut resource = csr_resource(SAN_CSR_PEM, true);
        decode_and_redact(&mut resource);

        let request = resource.get(&["spec", "request"]).unwrap();
        assert!(request.get("subject").is_some());
        assert_eq!(
            resource.get_str(&["status", "certificate"]),
            Some(CERTIFICATE_REDACTION)
        );
    }

    #[test]
    fn test_decode_and_redact_fallback_keeps_raw_value() {
        let raw = STANDARD.encode(b"garbage bytes where PEM is expected");
        let text = format!("metadata:\n  name: csr-2\nspec:\n  request: {raw}\nstatus:\n  certificate: c2VjcmV0\n");
        let mut resource = Resource::parse(&text).unwrap();
        let before = resource.clone();
        decode_and_redact(&mut resource);
        // unchanged, including the issued certificate
        assert_eq!(resource, before);
    }

    #[test]
    fn test_format_ip_expanded() {
        assert_eq!(format_ip(&[10, 0, 0, 1]).unwrap(), "10.0.0.1");
        let mut v6 = [0u8; 16];
        v6[0] = 0x20;
        v6[1] = 0x01;
        v6[2] = 0x0d;
        v6[3] = 0xb8;
        v6[15] = 0x01;
        assert_eq!(
            format_ip(&v6).unwrap(),
            "2001:0db8:0000:0000:0000:0000:0000:0001"
        );
        assert!(format_ip(&[1, 2, 3]).is_none());
    }
}
