mod common;

use common::{COMPOSE, FakeHost, stack};
use vcdeploy::DeployError;
use vcdeploy::preflight::{self, OsRelease, validate_domain};

const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 24.04.1 LTS"
NAME="Ubuntu"
VERSION_ID="24.04"
VERSION="24.04.1 LTS (Noble Numbat)"
ID=ubuntu
ID_LIKE=debian
"#;

const DEBIAN: &str = r#"PRETTY_NAME="Debian GNU/Linux 12 (bookworm)"
NAME="Debian GNU/Linux"
VERSION_ID="12"
ID=debian
"#;

/// A server that passes every check.
fn ready_server() -> FakeHost {
    FakeHost::new()
        .file("/etc/os-release", UBUNTU)
        .file("/srv/vc/docker-compose.yml", COMPOSE)
        .on("id -u", "0")
}

#[test]
fn domains() {
    for ok in ["example.com", "vc.example.com", "a-b.example.co.uk", "EXAMPLE.COM"] {
        assert!(validate_domain(ok).is_ok(), "{ok} should be valid");
    }
    for bad in [
        "not a domain",
        "localhost",
        "-lead.example.com",
        "trail-.example.com",
        "example.c",
        "",
        "https://example.com",
    ] {
        assert!(
            matches!(validate_domain(bad), Err(DeployError::InvalidDomain(_))),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn overlong_domain_is_rejected() {
    let label = "a".repeat(63);
    let domain = format!("{label}.{label}.{label}.{label}.com");
    assert!(domain.len() > 253);
    assert!(validate_domain(&domain).is_err());
}

#[test]
fn parses_os_release() {
    let release = OsRelease::parse(UBUNTU);

    assert_eq!(release.id, "ubuntu");
    assert_eq!(release.version_id, "24.04");
    assert_eq!(release.pretty_name, "Ubuntu 24.04.1 LTS");
    assert!(release.is_ubuntu());
}

#[test]
fn non_ubuntu_is_unsupported() {
    let host = FakeHost::new().file("/etc/os-release", DEBIAN);

    let err = preflight::check_os(&host).expect_err("debian");

    assert_eq!(
        err.to_string(),
        "unsupported operating system: Debian GNU/Linux 12 (bookworm) (Ubuntu is required)"
    );
    assert!(err.is_preflight());
}

#[test]
fn missing_os_release_is_unsupported() {
    let host = FakeHost::new();

    assert!(matches!(
        preflight::check_os(&host),
        Err(DeployError::UnsupportedOs(_))
    ));
}

#[test]
fn non_root_is_rejected() {
    let host = FakeHost::new().on("id -u", "1000");

    let err = preflight::check_root(&host).expect_err("uid 1000");

    assert_eq!(err.to_string(), "must run as root (current uid: 1000)");
}

#[test]
fn unreachable_network() {
    let host = ready_server().fail("curl -fsS", "Could not resolve host");
    let stack = stack();

    let err = preflight::run(&host, &stack, "vc.example.com").expect_err("offline");

    assert!(matches!(err, DeployError::NoConnectivity(ref url) if url == "https://download.docker.com"));
}

#[test]
fn full_run_returns_layout() {
    let host = ready_server();
    let stack = stack();

    let layout = preflight::run(&host, &stack, "vc.example.com").expect("preflight");

    assert_eq!(layout.db_volume.as_deref(), Some("videocall_postgres_data"));
    assert!(host.ran("curl -fsS --max-time 10 -o /dev/null 'https://download.docker.com'"));
}

#[test]
fn invalid_domain_stops_before_network_check() {
    let host = ready_server();
    let stack = stack();

    let err = preflight::run(&host, &stack, "not a domain").expect_err("bad domain");

    assert!(matches!(err, DeployError::InvalidDomain(_)));
    assert!(!host.ran("curl"));
}

#[test]
fn machine_checks_come_before_domain() {
    let stack = stack();

    let debian = FakeHost::new().file("/etc/os-release", DEBIAN).on("id -u", "0");
    let err = preflight::run(&debian, &stack, "not a domain").expect_err("debian");
    assert!(matches!(err, DeployError::UnsupportedOs(_)));

    let user = ready_server().on("id -u", "1000");
    let err = preflight::run(&user, &stack, "not a domain").expect_err("not root");
    assert!(matches!(err, DeployError::NotRoot(_)));
}

#[test]
fn machine_check_alone_ignores_domain_and_network() {
    let host = ready_server();

    preflight::check_machine(&host).expect("ubuntu as root");

    assert!(host.ran("id -u"));
    assert!(!host.ran("curl"));
}

#[test]
fn missing_compose_file() {
    let host = FakeHost::new()
        .file("/etc/os-release", UBUNTU)
        .on("id -u", "0");
    let stack = stack();

    let err = preflight::run(&host, &stack, "vc.example.com").expect_err("no compose");

    assert_eq!(
        err.to_string(),
        "compose file not found: /srv/vc/docker-compose.yml"
    );
}

#[test]
fn repair_preflight_skips_os_and_domain() {
    let host = FakeHost::new()
        .file("/srv/vc/docker-compose.yml", COMPOSE)
        .on("id -u", "0");
    let stack = stack();

    let layout = preflight::run_for_repair(&host, &stack).expect("repair preflight");

    assert_eq!(layout.services, vec!["db", "redis", "backend"]);
    assert!(!host.ran("curl"));
}
