mod common;

use common::{FakeHost, Reply};
use vcdeploy::DeployError;
use vcdeploy::install::{
    self, Apt, AptPackage, CertStatus, Certbot, Docker, Firewall, InstallStatus,
};

#[test]
fn present_package_is_left_alone() {
    let host = FakeHost::new();
    let apt = Apt::new(&host);

    let status = install::ensure(&apt, &AptPackage::new("nginx")).expect("ensure");

    assert_eq!(status, InstallStatus::AlreadyPresent);
    assert!(!host.ran("apt-get"));
}

#[test]
fn missing_package_is_installed_and_verified() {
    let host = FakeHost::new().on_seq(
        "command -v 'certbot'",
        vec![Reply::Fail(String::new()), Reply::Ok("/usr/bin/certbot".into())],
    );
    let apt = Apt::new(&host);
    let certbot = AptPackage::new("certbot").with_extra("python3-certbot-nginx");

    let status = install::ensure(&apt, &certbot).expect("ensure");

    assert_eq!(status, InstallStatus::Installed);
    assert!(host.ran(
        "DEBIAN_FRONTEND=noninteractive apt-get install -y 'certbot' 'python3-certbot-nginx'"
    ));
}

#[test]
fn package_index_refreshed_once() {
    let host = FakeHost::new()
        .on_seq(
            "command -v 'curl'",
            vec![Reply::Fail(String::new()), Reply::Ok(String::new())],
        )
        .on_seq(
            "command -v 'ufw'",
            vec![Reply::Fail(String::new()), Reply::Ok(String::new())],
        );
    let apt = Apt::new(&host);

    install::ensure(&apt, &AptPackage::new("curl")).expect("curl");
    install::ensure(&apt, &AptPackage::new("ufw")).expect("ufw");

    assert_eq!(host.count("apt-get update -y"), 1);
    assert_eq!(host.count("apt-get install -y"), 2);
}

#[test]
fn install_that_does_not_stick_is_fatal() {
    let host = FakeHost::new().fail("command -v 'nginx'", "");
    let apt = Apt::new(&host);

    let err = install::ensure(&apt, &AptPackage::new("nginx")).expect_err("still missing");

    assert_eq!(
        err.to_string(),
        "prerequisite missing: nginx still unavailable after install"
    );
}

#[test]
fn docker_uses_convenience_script() {
    let host = FakeHost::new().on_seq(
        "docker --version",
        vec![
            Reply::Fail("not found".into()),
            Reply::Ok("Docker version 27.3.1".into()),
        ],
    );
    let apt = Apt::new(&host);

    let status = install::ensure(&apt, &Docker).expect("docker");

    assert_eq!(status, InstallStatus::Installed);
    let script = host.position("get.docker.com").expect("script");
    let enable = host.position("systemctl enable --now docker").expect("enable");
    assert!(script < enable);
}

#[test]
fn failed_install_command_propagates() {
    let host = FakeHost::new()
        .fail("command -v 'ufw'", "")
        .fail("apt-get install", "E: Unable to locate package ufw");
    let apt = Apt::new(&host);

    let err = install::ensure(&apt, &AptPackage::new("ufw")).expect_err("apt failed");

    assert!(matches!(err, DeployError::CommandFailed { .. }));
}

#[test]
fn install_all_on_ready_server() {
    let host = FakeHost::new();

    let statuses = install::install_all(&host).expect("install_all");

    assert_eq!(statuses.len(), 7);
    assert!(
        statuses
            .iter()
            .all(|(_, s)| *s == InstallStatus::AlreadyPresent)
    );
}

#[test]
fn firewall_allows_ssh_before_enabling() {
    let host = FakeHost::new();

    Firewall::new().apply(&host).expect("firewall");

    assert_eq!(
        host.commands(),
        vec![
            "ufw allow 'OpenSSH'",
            "ufw allow 'Nginx Full'",
            "ufw --force enable",
        ]
    );
}

#[test]
fn existing_certificate_is_kept() {
    let host = FakeHost::new().file(
        "/etc/letsencrypt/live/vc.example.com/fullchain.pem",
        "-----BEGIN CERTIFICATE-----",
    );

    let status = Certbot::new("vc.example.com").ensure(&host).expect("certbot");

    assert_eq!(status, CertStatus::Existing);
    assert!(!host.ran("certbot certonly"));
}

#[test]
fn certificate_is_issued_and_renewal_enabled() {
    let host = FakeHost::new();

    let status = Certbot::new("vc.example.com")
        .email("ops@example.com")
        .ensure(&host)
        .expect("certbot");

    assert_eq!(status, CertStatus::Issued);
    assert!(host.ran("certbot certonly --nginx -d 'vc.example.com'"));
    assert!(host.ran("systemctl enable --now certbot.timer"));
    assert!(host.ran("systemctl reload nginx"));
}
