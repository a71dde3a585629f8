#![allow(clippy::unwrap_used)]
// Loading, layering, and translation of panfly config files.

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use panfly_config::{
    Config, ConfigError, Profile, load_config_from, profile_context, resolve_api_key,
    resolve_profile, save_config_to,
};
use panfly_core::{DeviceContext, DeviceKind, TlsVerification};

const SAMPLE: &str = r#"
default_profile = "lab"

[defaults]
timeout = 15
poll_interval = 1
poll_max_interval = 4

[profiles.lab]
url = "https://fw-lab.example.net"
api_key = "plain-key"
vsys = "vsys2"

[profiles.pano]
url = "https://pano.example.net"
kind = "panorama"
api_key_env = "PANO_KEY"
device_group = "branch"
ca_cert = "/etc/ssl/pano.pem"
"#;

fn to_figment(err: ConfigError) -> figment::Error {
    err.to_string().into()
}

#[test]
fn test_file_values_and_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        let config = load_config_from(Path::new("config.toml")).map_err(to_figment)?;

        assert_eq!(config.default_profile.as_deref(), Some("lab"));
        assert_eq!(config.defaults.timeout, 15);
        assert_eq!(config.defaults.default_vsys, "vsys1");
        assert_eq!(config.defaults.commit_timeout, 600);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles["pano"].kind, DeviceKind::Panorama);
        Ok(())
    });
}

#[test]
fn test_environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("PANFLY_DEFAULTS__TIMEOUT", "5");
        jail.set_env("PANFLY_PROFILES__LAB__VSYS", "vsys3");
        let config = load_config_from(Path::new("config.toml")).map_err(to_figment)?;

        assert_eq!(config.defaults.timeout, 5);
        assert_eq!(config.profiles["lab"].vsys.as_deref(), Some("vsys3"));
        Ok(())
    });
}

#[test]
fn test_missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let config = load_config_from(Path::new("absent.toml")).map_err(to_figment)?;
        assert_eq!(config, Config::default());
        Ok(())
    });
}

#[test]
fn test_resolve_profile_builds_device_config() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        let config = load_config_from(Path::new("config.toml")).map_err(to_figment)?;

        let (device, ctx) = resolve_profile(&config, None).map_err(to_figment)?;
        assert_eq!(device.url.as_str(), "https://fw-lab.example.net/");
        assert_eq!(device.api_key.expose_secret(), "plain-key");
        assert_eq!(device.timeout, Duration::from_secs(15));
        assert_eq!(device.poll.interval, Duration::from_secs(1));
        assert_eq!(device.poll.max_interval, Duration::from_secs(4));
        assert_eq!(ctx, DeviceContext::vsys("vsys2"));
        Ok(())
    });
}

#[test]
fn test_plain_profile_polls_fixed_and_verifies_tls() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[profiles.edge]
url = "https://fw-edge.example.net"
api_key = "edge-key"

[profiles.lab]
url = "https://fw-lab.example.net"
api_key = "lab-key"
insecure = true
"#,
        )?;
        let config = load_config_from(Path::new("config.toml")).map_err(to_figment)?;

        let (device, _) = resolve_profile(&config, Some("edge")).map_err(to_figment)?;
        assert_eq!(device.tls, TlsVerification::SystemDefaults);
        assert_eq!(device.poll.interval, Duration::from_secs(2));
        assert_eq!(device.poll.max_interval, device.poll.interval);

        let (device, _) = resolve_profile(&config, Some("lab")).map_err(to_figment)?;
        assert_eq!(device.tls, TlsVerification::DangerAcceptInvalid);
        Ok(())
    });
}

#[test]
fn test_panorama_profile_uses_env_key_and_ca() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("PANO_KEY", "from-env");
        let config = load_config_from(Path::new("config.toml")).map_err(to_figment)?;

        let (device, ctx) = resolve_profile(&config, Some("pano")).map_err(to_figment)?;
        assert_eq!(device.kind, DeviceKind::Panorama);
        assert_eq!(device.api_key.expose_secret(), "from-env");
        assert_eq!(
            device.tls,
            TlsVerification::CustomCa("/etc/ssl/pano.pem".into())
        );
        assert_eq!(ctx, DeviceContext::device_group("branch"));
        Ok(())
    });
}

#[test]
fn test_api_key_resolution_order() {
    Jail::expect_with(|jail| {
        let mut profile = Profile {
            url: "https://fw.example.net".into(),
            api_key: Some("plain".into()),
            api_key_env: Some("LAB_KEY".into()),
            ..Profile::default()
        };
        assert_eq!(
            resolve_api_key(&profile, "lab").unwrap().expose_secret(),
            "plain"
        );

        jail.set_env("PANFLY_API_KEY", "global");
        assert_eq!(
            resolve_api_key(&profile, "lab").unwrap().expose_secret(),
            "global"
        );

        jail.set_env("LAB_KEY", "specific");
        assert_eq!(
            resolve_api_key(&profile, "lab").unwrap().expose_secret(),
            "specific"
        );

        profile.api_key_env = None;
        profile.api_key = None;
        assert_eq!(
            resolve_api_key(&profile, "lab").unwrap().expose_secret(),
            "global"
        );
        Ok(())
    });
}

#[test]
fn test_missing_credentials_and_profiles() {
    Jail::expect_with(|_jail| {
        let profile = Profile {
            url: "https://fw.example.net".into(),
            ..Profile::default()
        };
        assert!(matches!(
            resolve_api_key(&profile, "bare"),
            Err(ConfigError::NoCredentials { ref profile }) if profile == "bare"
        ));

        let config = Config::default();
        assert!(matches!(
            resolve_profile(&config, Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        Ok(())
    });
}

#[test]
fn test_conflicting_selectors_rejected() {
    let profile = Profile {
        url: "https://pano.example.net".into(),
        kind: DeviceKind::Panorama,
        device_group: Some("branch".into()),
        template: Some("branch-net".into()),
        ..Profile::default()
    };
    let err = profile_context(&profile).unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }), "{err}");
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            url: "https://fw.example.net".into(),
            api_key_env: Some("FW_KEY".into()),
            ..Profile::default()
        },
    );
    save_config_to(&config, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let reloaded: Config = toml::from_str(&text).unwrap();
    assert_eq!(reloaded, config);
}
