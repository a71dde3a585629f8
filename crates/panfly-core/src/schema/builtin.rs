// Built-in schema tables.

use crate::model::ObjectType;

use super::{Container, FieldKind, FieldSet, Schema, ScopeSupport};

const DESCRIPTION: FieldKind = FieldKind::Text { max_len: 1023 };
const RULE_DESCRIPTION: FieldKind = FieldKind::Text { max_len: 1024 };
const NAME_REF: FieldKind = FieldKind::Text { max_len: 63 };
const INTERFACE: FieldKind = FieldKind::Text { max_len: 31 };

const RULE_ACTIONS: &[&str] = &[
    "allow",
    "deny",
    "drop",
    "reset-client",
    "reset-server",
    "reset-both",
];
const RULE_TYPES: &[&str] = &["universal", "intrazone", "interzone"];
const NAT_TYPES: &[&str] = &["ipv4", "nat64", "nptv6"];

pub(super) fn schemas() -> Vec<Schema> {
    vec![
        address(),
        address_group(),
        service(),
        service_group(),
        security_policy(),
        nat_policy(),
        tag(),
        zone(),
    ]
}

fn address() -> Schema {
    Schema::new(
        ObjectType::Address,
        Container::Object("address"),
        FieldSet::new()
            .optional("ip-netmask", FieldKind::IpNetmask)
            .optional("ip-range", FieldKind::IpRange)
            .optional("ip-wildcard", FieldKind::IpWildcard)
            .optional("fqdn", FieldKind::Fqdn)
            .optional("description", DESCRIPTION)
            .optional("tag", FieldKind::MEMBERS)
            .one_of(&["ip-netmask", "ip-range", "ip-wildcard", "fqdn"]),
    )
    .with_alias("netmask", "ip-netmask")
    .with_alias("ip", "ip-netmask")
    .with_alias("range", "ip-range")
    .with_alias("wildcard", "ip-wildcard")
    .with_alias("tags", "tag")
}

fn address_group() -> Schema {
    Schema::new(
        ObjectType::AddressGroup,
        Container::Object("address-group"),
        FieldSet::new()
            .optional("static", FieldKind::MEMBERS)
            .optional(
                "dynamic",
                FieldKind::Nested(
                    FieldSet::new().required("filter", FieldKind::Text { max_len: 2047 }),
                ),
            )
            .optional("description", DESCRIPTION)
            .optional("tag", FieldKind::MEMBERS)
            .one_of(&["static", "dynamic"]),
    )
    .with_alias("members", "static")
    .with_alias("tags", "tag")
}

fn transport_ports() -> FieldSet {
    FieldSet::new()
        .required("port", FieldKind::PortSpec)
        .optional("source-port", FieldKind::PortSpec)
}

fn service() -> Schema {
    let protocol = FieldSet::new()
        .optional("tcp", FieldKind::Nested(transport_ports()))
        .optional("udp", FieldKind::Nested(transport_ports()))
        .optional("sctp", FieldKind::Nested(transport_ports()))
        .one_of(&["tcp", "udp", "sctp"]);

    Schema::new(
        ObjectType::Service,
        Container::Object("service"),
        FieldSet::new()
            .required("protocol", FieldKind::Nested(protocol))
            .optional("description", DESCRIPTION)
            .optional("tag", FieldKind::MEMBERS),
    )
    .with_alias("tags", "tag")
}

fn service_group() -> Schema {
    Schema::new(
        ObjectType::ServiceGroup,
        Container::Object("service-group"),
        FieldSet::new()
            .required("members", FieldKind::MEMBERS)
            .optional("tag", FieldKind::MEMBERS),
    )
    .with_alias("services", "members")
    .with_alias("tags", "tag")
}

fn security_policy() -> Schema {
    let profile_setting = FieldSet::new().optional("group", FieldKind::MEMBERS);

    Schema::new(
        ObjectType::SecurityPolicy,
        Container::Rulebase("security"),
        FieldSet::new()
            .required("from", FieldKind::MEMBERS)
            .required("to", FieldKind::MEMBERS)
            .required("source", FieldKind::MEMBERS)
            .required("destination", FieldKind::MEMBERS)
            .required("application", FieldKind::MEMBERS)
            .required("service", FieldKind::MEMBERS)
            .required("action", FieldKind::Choice(RULE_ACTIONS))
            .optional("source-user", FieldKind::MEMBERS)
            .optional("category", FieldKind::MEMBERS)
            .optional("description", RULE_DESCRIPTION)
            .optional("tag", FieldKind::MEMBERS)
            .optional("disabled", FieldKind::YesNo)
            .optional("negate-source", FieldKind::YesNo)
            .optional("negate-destination", FieldKind::YesNo)
            .optional("log-start", FieldKind::YesNo)
            .optional("log-end", FieldKind::YesNo)
            .optional("log-setting", NAME_REF)
            .optional("rule-type", FieldKind::Choice(RULE_TYPES))
            .optional("profile-setting", FieldKind::Nested(profile_setting)),
    )
    .with_scopes(ScopeSupport::POLICY)
    .with_alias("from-zone", "from")
    .with_alias("source-zone", "from")
    .with_alias("to-zone", "to")
    .with_alias("destination-zone", "to")
    .with_alias("src", "source")
    .with_alias("dst", "destination")
    .with_alias("app", "application")
    .with_alias("applications", "application")
    .with_alias("services", "service")
    .with_alias("tags", "tag")
}

fn nat_policy() -> Schema {
    let dynamic_ip_and_port = FieldSet::new()
        .optional("translated-address", FieldKind::MEMBERS)
        .optional(
            "interface-address",
            FieldKind::Nested(
                FieldSet::new()
                    .required("interface", INTERFACE)
                    .optional("ip", FieldKind::AddressRef),
            ),
        )
        .one_of(&["translated-address", "interface-address"]);

    let source_translation = FieldSet::new()
        .optional("dynamic-ip-and-port", FieldKind::Nested(dynamic_ip_and_port))
        .optional(
            "dynamic-ip",
            FieldKind::Nested(FieldSet::new().required("translated-address", FieldKind::MEMBERS)),
        )
        .optional(
            "static-ip",
            FieldKind::Nested(
                FieldSet::new()
                    .required("translated-address", FieldKind::AddressRef)
                    .optional("bi-directional", FieldKind::YesNo),
            ),
        )
        .one_of(&["dynamic-ip-and-port", "dynamic-ip", "static-ip"]);

    let destination_translation = FieldSet::new()
        .required("translated-address", FieldKind::AddressRef)
        .optional("translated-port", FieldKind::PortSpec);

    Schema::new(
        ObjectType::NatPolicy,
        Container::Rulebase("nat"),
        FieldSet::new()
            .required("from", FieldKind::MEMBERS)
            .required("to", FieldKind::MEMBERS)
            .required("source", FieldKind::MEMBERS)
            .required("destination", FieldKind::MEMBERS)
            .required("service", NAME_REF)
            .optional("to-interface", INTERFACE)
            .optional("nat-type", FieldKind::Choice(NAT_TYPES))
            .optional("source-translation", FieldKind::Nested(source_translation))
            .optional(
                "destination-translation",
                FieldKind::Nested(destination_translation),
            )
            .optional("description", RULE_DESCRIPTION)
            .optional("tag", FieldKind::MEMBERS)
            .optional("disabled", FieldKind::YesNo),
    )
    .with_scopes(ScopeSupport::POLICY)
    .with_alias("from-zone", "from")
    .with_alias("source-zone", "from")
    .with_alias("to-zone", "to")
    .with_alias("destination-zone", "to")
    .with_alias("src", "source")
    .with_alias("dst", "destination")
    .with_alias("tags", "tag")
}

fn tag() -> Schema {
    Schema::new(
        ObjectType::Tag,
        Container::Object("tag"),
        FieldSet::new()
            .optional("color", FieldKind::Color)
            .optional("comments", DESCRIPTION),
    )
    .with_alias("comment", "comments")
    .with_alias("description", "comments")
}

fn zone() -> Schema {
    let network = FieldSet::new()
        .optional("layer3", FieldKind::MEMBERS_OR_EMPTY)
        .optional("layer2", FieldKind::MEMBERS_OR_EMPTY)
        .optional("virtual-wire", FieldKind::MEMBERS_OR_EMPTY)
        .optional("tap", FieldKind::MEMBERS_OR_EMPTY)
        .optional("zone-protection-profile", NAME_REF)
        .optional("log-setting", NAME_REF)
        .one_of(&["layer3", "layer2", "virtual-wire", "tap"]);

    Schema::new(
        ObjectType::Zone,
        Container::Object("zone"),
        FieldSet::new()
            .required("network", FieldKind::Nested(network))
            .optional("enable-user-identification", FieldKind::YesNo),
    )
    .with_scopes(ScopeSupport::NETWORK)
}
