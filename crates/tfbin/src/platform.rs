//! Host platform names as the provider registry spells them.

use std::env::consts;

pub fn current_os() -> &'static str {
    registry_os(consts::OS)
}

pub fn current_arch() -> &'static str {
    registry_arch(consts::ARCH)
}

fn registry_os(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn registry_arch(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}
