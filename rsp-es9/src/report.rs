//! eUICC capability report extraction
//!
//! Walks an `AuthenticateResponseOk` tree and pulls out what the eUICC
//! disclosed about itself:
//!
//! ```text
//! AuthenticateResponseOk ::= [0] SEQUENCE {
//!     euiccSigned1 SEQUENCE {
//!         transactionId [0], serverAddress [3], serverChallenge [4],
//!         euiccInfo2 [34] EUICCInfo2,
//!         ctxParams1 [0] { matchingId [0], deviceInfo [1] { tac [0], imei [2] } }
//!     },
//!     euiccSignature1 [APPLICATION 55],
//!     euiccCertificate Certificate,
//!     eumCertificate Certificate
//! }
//! ```
//!
//! Extraction never fails on a missing element: the schema is mostly
//! optional, so an absent field simply keeps its zero value.

use crate::tags;
use rsp_bertlv::{Tag, Tlv};
use rsp_core::{KeyIdentifier, Version};
use serde::Serialize;

/// UICC capability bits, `UICCCapability` BIT STRING order
pub const UICC_CAPABILITIES: &[&str] = &[
    "Contactless Support",
    "USIM Support",
    "ISIM Support",
    "CSIM Support",
    "DeviceInfo Extensibility Support",
    "AkaMilenage",
    "AkaCave",
    "AkaTuak128",
    "AkaTuak256",
    "RFU1",
    "RFU2",
    "GBA Authentication USIM",
    "GBA Authentication ISIM",
    "MBMS Authentication USIM",
    "EAP Client",
    "JavaCard",
    "MultOS",
    "Multiple USIM Support",
    "Multiple ISIM Support",
    "Multiple CSIM Support",
    "Ber TLV File Support",
    "DF Link Support",
    "CAT TP",
    "GET IDENTITY",
    "profile-a-x25519",
    "profile-b-p256",
    "SUCICalculatorAPI",
];

/// RSP capability bits, `RspCapability` BIT STRING order
pub const RSP_CAPABILITIES: &[&str] = &[
    "additionalProfile",
    "crlSupport",
    "rpmSupport",
    "testProfileSupport",
    "deviceInfoExtensibilitySupport",
];

/// Forbidden profile policy rule bits, `PprIds` BIT STRING order
pub const PROFILE_POLICY_RULES: &[&str] = &["pprUpdateControl", "ppr1", "ppr2"];

/// TRE property bits, `TreProperties` BIT STRING order
pub const TRE_PROPERTIES: &[&str] = &["isDiscrete", "isIntegrated", "usesRemoteMemory"];

const PROFILE_VERSION: Tag = Tag::short(0x81);
const EUICC_FIRMWARE_VERSION: Tag = Tag::short(0x83);
const EXT_CARD_RESOURCE: Tag = Tag::short(0x84);
const UICC_CAPABILITY: Tag = Tag::short(0x85);
const TS102241_VERSION: Tag = Tag::short(0x86);
const GLOBALPLATFORM_VERSION: Tag = Tag::short(0x87);
const RSP_CAPABILITY: Tag = Tag::short(0x88);
const EUICC_CATEGORY: Tag = Tag::short(0x8B);
const FORBIDDEN_PROFILE_POLICY_RULES: Tag = Tag::short(0x99);
const UTF8_STRING: Tag = Tag::short(0x0C);
const CERTIFICATION_DATA_OBJECT: Tag = Tag::short(0xAC);
const TRE_PROPERTIES_TAG: Tag = Tag::short(0x8D);
const TRE_PRODUCT_REFERENCE: Tag = Tag::short(0x8E);
const ADDITIONAL_PROFILE_PACKAGE_VERSIONS: Tag = Tag::short(0xAF);

/// ExtCardResource sub-tags
const INSTALLED_APPLICATIONS: u8 = 0x81;
const FREE_NVRAM: u8 = 0x82;
const FREE_RAM: u8 = 0x83;

/// `euiccCategory`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum EuiccCategory {
    #[default]
    Other,
    #[serde(rename = "Basic eUICC")]
    Basic,
    #[serde(rename = "Medium eUICC")]
    Medium,
    #[serde(rename = "Contactless eUICC")]
    Contactless,
}

impl EuiccCategory {
    /// Resolve a category code; codes outside the table read as `Other`
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => Self::Basic,
            2 => Self::Medium,
            3 => Self::Contactless,
            _ => Self::Other,
        }
    }
}

/// `certificationDataObject`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CertificationData {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub platform_label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discovery_base_url: String,
}

/// `deviceInfo` from ctxParams1
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Type Allocation Code, hex
    pub tac: String,
    /// IMEI as sent by the LPA, hex
    #[serde(skip_serializing_if = "String::is_empty")]
    pub imei: String,
}

/// Decoded `EUICCInfo2`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EuiccInfo2 {
    #[serde(skip_serializing_if = "Version::is_zero")]
    pub profile_version: Version,
    #[serde(rename = "sgp22_version_supported", skip_serializing_if = "Version::is_zero")]
    pub svn: Version,
    #[serde(rename = "euicc_firmware_version", skip_serializing_if = "Version::is_zero")]
    pub firmware_version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_applications: Option<u64>,
    #[serde(skip_serializing_if = "is_zero")]
    pub free_nvram: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_ram: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uicc_capability: Vec<String>,
    #[serde(skip_serializing_if = "Version::is_zero")]
    pub ts102241_version: Version,
    #[serde(rename = "gp_version", skip_serializing_if = "Version::is_zero")]
    pub globalplatform_version: Version,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rsp_capability: Vec<String>,
    #[serde(rename = "issuer_for_verification", skip_serializing_if = "Vec::is_empty")]
    pub issuers_for_verification: Vec<KeyIdentifier>,
    #[serde(rename = "issuer_for_signing", skip_serializing_if = "Vec::is_empty")]
    pub issuers_for_signing: Vec<KeyIdentifier>,
    pub category: EuiccCategory,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forbidden_profile_policy_rules: Vec<String>,
    #[serde(skip_serializing_if = "Version::is_zero")]
    pub pp_version: Version,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sas_accreditation_number: String,
    #[serde(rename = "certification_data_object", skip_serializing_if = "Option::is_none")]
    pub certification_data: Option<CertificationData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tre_properties: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tre_product_reference: String,
    #[serde(rename = "additional_profile_package_versions", skip_serializing_if = "Vec::is_empty")]
    pub additional_versions: Vec<Version>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Read a primitive child as trimmed UTF-8 text; invalid sequences are replaced
fn text(node: &Tlv, tag: Tag) -> String {
    node.first(tag)
        .map(|child| String::from_utf8_lossy(child.value()).trim().to_string())
        .unwrap_or_default()
}

fn version(node: &Tlv, tag: Tag) -> Version {
    node.first(tag)
        .map(|child| Version::from_bytes(child.value()))
        .unwrap_or_default()
}

fn key_identifiers(node: &Tlv, tag: Tag) -> Vec<KeyIdentifier> {
    node.first(tag)
        .map(|list| {
            list.children()
                .iter()
                .map(|child| KeyIdentifier::from(child.value()))
                .collect()
        })
        .unwrap_or_default()
}

fn features(node: &Tlv, tag: Tag, definitions: &[&str]) -> Vec<String> {
    node.first(tag)
        .map(|bits| bits.bit_string_features(definitions))
        .unwrap_or_default()
}

impl EuiccInfo2 {
    /// Extract an `EUICCInfo2` from its `[34]` node
    pub fn extract(info: &Tlv) -> Self {
        let mut info2 = EuiccInfo2 {
            profile_version: version(info, PROFILE_VERSION),
            svn: version(info, tags::SVN),
            firmware_version: version(info, EUICC_FIRMWARE_VERSION),
            uicc_capability: features(info, UICC_CAPABILITY, UICC_CAPABILITIES),
            ts102241_version: version(info, TS102241_VERSION),
            globalplatform_version: version(info, GLOBALPLATFORM_VERSION),
            rsp_capability: features(info, RSP_CAPABILITY, RSP_CAPABILITIES),
            issuers_for_verification: key_identifiers(info, tags::CI_PKID_LIST_FOR_VERIFICATION),
            issuers_for_signing: key_identifiers(info, tags::CI_PKID_LIST_FOR_SIGNING),
            category: info
                .first(EUICC_CATEGORY)
                .map(|category| EuiccCategory::from_code(category.as_uint()))
                .unwrap_or_default(),
            forbidden_profile_policy_rules: features(
                info,
                FORBIDDEN_PROFILE_POLICY_RULES,
                PROFILE_POLICY_RULES,
            ),
            pp_version: version(info, tags::OCTET_STRING),
            sas_accreditation_number: text(info, UTF8_STRING),
            certification_data: info.first(CERTIFICATION_DATA_OBJECT).map(|data| CertificationData {
                platform_label: text(data, tags::CONTEXT_0),
                discovery_base_url: text(data, tags::CONTEXT_1),
            }),
            tre_properties: features(info, TRE_PROPERTIES_TAG, TRE_PROPERTIES),
            tre_product_reference: text(info, TRE_PRODUCT_REFERENCE),
            additional_versions: info
                .first(ADDITIONAL_PROFILE_PACKAGE_VERSIONS)
                .map(|versions| {
                    versions
                        .find(tags::OCTET_STRING)
                        .map(|v| Version::from_bytes(v.value()))
                        .collect()
                })
                .unwrap_or_default(),
            ..Default::default()
        };
        if let Some(resource) = info.first(EXT_CARD_RESOURCE) {
            info2.read_ext_card_resource(resource.value());
        }
        info2
    }

    /// Decode the packed `extCardResource` OCTET STRING
    ///
    /// The value is itself a run of one-byte-tag TLVs holding big-endian
    /// integers. Decoding stops quietly at the first malformed entry.
    fn read_ext_card_resource(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let Ok((entry, consumed)) = Tlv::decode_slice(data) else {
                break;
            };
            let value = entry.as_uint();
            match entry.tag().as_bytes() {
                [INSTALLED_APPLICATIONS] => self.installed_applications = Some(value),
                [FREE_NVRAM] => self.free_nvram = value,
                [FREE_RAM] => self.free_ram = Some(value),
                _ => {}
            }
            data = &data[consumed..];
        }
    }
}

/// Everything extracted from one successful AuthenticateClient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Hex transaction id echoed in euiccSigned1
    #[serde(skip_serializing_if = "String::is_empty")]
    pub transaction_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub matching_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub server_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    pub euicc_info2: EuiccInfo2,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub euicc_certificate: Option<Tlv>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eum_certificate: Option<Tlv>,
}

impl Report {
    /// Extract the report from an `authenticateResponseOk` node
    ///
    /// # Arguments
    /// * `response` - The `[0]` child of AuthenticateServerResponse
    ///
    /// # Returns
    /// The report; elements absent from the tree keep their defaults.
    pub fn extract(response: &Tlv) -> Self {
        let mut report = Report {
            euicc_certificate: response.at(2).cloned(),
            eum_certificate: response.at(3).cloned(),
            ..Default::default()
        };
        let Some(signed) = response.at(0) else {
            return report;
        };
        report.transaction_id = signed
            .first(tags::CONTEXT_0)
            .map(|id| hex::encode(id.value()))
            .unwrap_or_default();
        report.server_address = text(signed, tags::CONTEXT_3);
        if let Some(info2) = signed.first(tags::EUICC_INFO2) {
            report.euicc_info2 = EuiccInfo2::extract(info2);
        }
        if let Some(ctx) = signed.first(tags::CONSTRUCTED_0) {
            report.matching_id = text(ctx, tags::CONTEXT_0);
            report.device_info = ctx.first(tags::CONSTRUCTED_1).map(|device| DeviceInfo {
                tac: device
                    .first(tags::CONTEXT_0)
                    .map(|tac| hex::encode(tac.value()))
                    .unwrap_or_default(),
                imei: device
                    .first(tags::SVN)
                    .map(|imei| hex::encode(imei.value()))
                    .unwrap_or_default(),
            });
        }
        report
    }

    /// `EUICCInfo2` as pretty-printed JSON
    pub fn euicc_info2_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.euicc_info2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prim(tag: u8, value: &[u8]) -> Tlv {
        Tlv::primitive(Tag::short(tag), value.to_vec())
    }

    fn cons(tag: u8, children: Vec<Tlv>) -> Tlv {
        Tlv::constructed(Tag::short(tag), children)
    }

    fn sample_info2() -> Tlv {
        Tlv::constructed(
            tags::EUICC_INFO2,
            vec![
                prim(0x81, &[2, 1, 0]),
                prim(0x82, &[2, 2, 2]),
                prim(0x83, &[4, 5, 1]),
                // installed apps 1, free NVRAM 0x0001_2345, free RAM 0x1000
                prim(0x84, &[0x81, 0x01, 0x01, 0x82, 0x03, 0x01, 0x23, 0x45, 0x83, 0x02, 0x10, 0x00]),
                prim(0x85, &[0x05, 0b1110_0000, 0x00, 0x00, 0b1000_0000]),
                prim(0x86, &[9, 2, 0]),
                prim(0x87, &[2, 3, 0]),
                prim(0x88, &[0x03, 0b1001_0000]),
                cons(0xA9, vec![prim(0x04, &[0xF5, 0x41]), prim(0x04, &[0x81, 0x37])]),
                cons(0xAA, vec![prim(0x04, &[0xF5, 0x41])]),
                prim(0x8B, &[0x02]),
                prim(0x99, &[0x05, 0b0110_0000]),
                prim(0x04, &[1, 0, 0]),
                prim(0x0C, b" GI-BA-UP-0419 "),
                cons(0xAC, vec![prim(0x80, b"Platform"), prim(0x81, b"lpa.example.com")]),
                prim(0x8D, &[0x05, 0b1000_0000]),
                prim(0x8E, b"TRE-1"),
                cons(0xAF, vec![prim(0x04, &[2, 0, 0]), prim(0x04, &[3, 1, 0])]),
            ],
        )
    }

    fn sample_response() -> Tlv {
        let signed = cons(
            0x30,
            vec![
                prim(0x80, &[0xAB, 0xCD]),
                prim(0x83, b"rsp.example.com"),
                prim(0x84, &[0u8; 16]),
                sample_info2(),
                cons(
                    0xA0,
                    vec![
                        prim(0x80, b"user@example.com"),
                        cons(0xA1, vec![prim(0x80, &[0x35, 0x29, 0x06, 0x11]), cons(0xA1, vec![])]),
                    ],
                ),
            ],
        );
        cons(
            0xA0,
            vec![
                signed,
                Tlv::primitive(Tag::long(0x5F, 0x37), vec![0u8; 64]),
                cons(0x30, vec![prim(0x02, &[0x01])]),
                cons(0x30, vec![prim(0x02, &[0x02])]),
            ],
        )
    }

    #[test]
    fn test_extract_euicc_info2() {
        let info = EuiccInfo2::extract(&sample_info2());
        assert_eq!(info.profile_version, Version::new(2, 1, 0));
        assert_eq!(info.svn, Version::new(2, 2, 2));
        assert_eq!(info.firmware_version, Version::new(4, 5, 1));
        assert_eq!(info.installed_applications, Some(1));
        assert_eq!(info.free_nvram, 0x0001_2345);
        assert_eq!(info.free_ram, Some(0x1000));
        assert_eq!(
            info.uicc_capability,
            vec!["Contactless Support", "USIM Support", "ISIM Support", "profile-a-x25519"]
        );
        assert_eq!(info.ts102241_version, Version::new(9, 2, 0));
        assert_eq!(info.globalplatform_version, Version::new(2, 3, 0));
        assert_eq!(info.rsp_capability, vec!["additionalProfile", "testProfileSupport"]);
        assert_eq!(info.issuers_for_verification.len(), 2);
        assert_eq!(info.issuers_for_signing[0].to_hex(), "f541");
        assert_eq!(info.category, EuiccCategory::Medium);
        assert_eq!(info.forbidden_profile_policy_rules, vec!["ppr1", "ppr2"]);
        assert_eq!(info.pp_version, Version::new(1, 0, 0));
        assert_eq!(info.sas_accreditation_number, "GI-BA-UP-0419");
        let cert = info.certification_data.as_ref().unwrap();
        assert_eq!(cert.platform_label, "Platform");
        assert_eq!(cert.discovery_base_url, "lpa.example.com");
        assert_eq!(info.tre_properties, vec!["isDiscrete"]);
        assert_eq!(info.tre_product_reference, "TRE-1");
        assert_eq!(info.additional_versions, vec![Version::new(2, 0, 0), Version::new(3, 1, 0)]);
    }

    #[test]
    fn test_extract_empty_info2_defaults() {
        let info = EuiccInfo2::extract(&Tlv::constructed(tags::EUICC_INFO2, vec![]));
        assert_eq!(info, EuiccInfo2::default());
        assert_eq!(info.category, EuiccCategory::Other);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json, json!({"category": "Other"}));
    }

    #[test]
    fn test_category_out_of_table() {
        assert_eq!(EuiccCategory::from_code(0), EuiccCategory::Other);
        assert_eq!(EuiccCategory::from_code(3), EuiccCategory::Contactless);
        assert_eq!(EuiccCategory::from_code(9), EuiccCategory::Other);
    }

    #[test]
    fn test_ext_card_resource_stops_on_garbage() {
        let info = EuiccInfo2::extract(&Tlv::constructed(
            tags::EUICC_INFO2,
            vec![prim(0x84, &[0x82, 0x02, 0x01, 0x00, 0x83, 0x09, 0x01])],
        ));
        assert_eq!(info.free_nvram, 256);
        assert_eq!(info.free_ram, None);
    }

    #[test]
    fn test_euicc_info2_json_names() {
        let info = EuiccInfo2::extract(&sample_info2());
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["profile_version"], "2.1.0");
        assert_eq!(json["sgp22_version_supported"], "2.2.2");
        assert_eq!(json["euicc_firmware_version"], "4.5.1");
        assert_eq!(json["free_nvram"], 0x0001_2345);
        assert_eq!(json["gp_version"], "2.3.0");
        assert_eq!(json["issuer_for_verification"], json!(["f541", "8137"]));
        assert_eq!(json["category"], "Medium eUICC");
        assert_eq!(json["certification_data_object"]["platform_label"], "Platform");
    }

    #[test]
    fn test_extract_report() {
        let report = Report::extract(&sample_response());
        assert_eq!(report.transaction_id, "abcd");
        assert_eq!(report.server_address, "rsp.example.com");
        assert_eq!(report.matching_id, "user@example.com");
        let device = report.device_info.as_ref().unwrap();
        assert_eq!(device.tac, "35290611");
        assert_eq!(device.imei, "");
        assert_eq!(report.euicc_info2.svn, Version::new(2, 2, 2));
        assert_eq!(report.euicc_certificate.as_ref().unwrap().at(0).unwrap().value(), &[0x01]);
        assert_eq!(report.eum_certificate.as_ref().unwrap().at(0).unwrap().value(), &[0x02]);
    }

    #[test]
    fn test_extract_report_from_empty_response() {
        let report = Report::extract(&cons(0xA0, vec![]));
        assert_eq!(report, Report::default());
    }
}
