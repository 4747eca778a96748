// file: src/bootstrap/content.rs
// version: 1.0.0
// guid: 4a6d0e73-b91f-4c28-8e35-7f2c1b9d6a40

//! Shell scripts and systemd units delivered to the bootstrap node
//!
//! Templates use `{{name}}` placeholders filled by [`render_template`].
//! Shell variables keep the `${VAR}` form and are left alone.

use crate::error::InstallError;
use crate::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// A file template with its destination and permissions
#[derive(Debug, Clone, Copy)]
pub struct FileTemplate {
    pub path: &'static str,
    pub mode: u32,
    pub contents: &'static str,
}

/// A systemd unit template
#[derive(Debug, Clone, Copy)]
pub struct UnitTemplate {
    pub name: &'static str,
    pub enabled: bool,
    pub contents: &'static str,
}

/// Pins the release image every other bootstrap script pulls from
pub const RELEASE_IMAGE_SH: &str = r#"#!/usr/bin/env bash
# shellcheck disable=SC2034
RELEASE_IMAGE_DIGEST="{{release_image}}"
"#;

/// Shared progress recording helpers, sourced by the other scripts
pub const BOOTSTRAP_SERVICE_RECORD_SH: &str = r#"#!/usr/bin/env bash
# Records bootstrap service stages as JSON lines for later collection.

BOOTSTRAP_RECORD_DIR=/var/log/openshift
mkdir -p "${BOOTSTRAP_RECORD_DIR}"

record_service_stage_start() {
    local stage="$1"
    printf '{"timestamp":"%s","service":"%s","stage":"%s","phase":"stage start"}\n' \
        "$(date +"%Y-%m-%dT%H:%M:%SZ" --utc)" "${SERVICE_NAME:-unknown}" "${stage}" \
        >> "${BOOTSTRAP_RECORD_DIR}/${SERVICE_NAME:-unknown}.log"
}

record_service_stage_success() {
    printf '{"timestamp":"%s","service":"%s","phase":"stage end","result":"success"}\n' \
        "$(date +"%Y-%m-%dT%H:%M:%SZ" --utc)" "${SERVICE_NAME:-unknown}" \
        >> "${BOOTSTRAP_RECORD_DIR}/${SERVICE_NAME:-unknown}.log"
}

record_service_stage_failure() {
    printf '{"timestamp":"%s","service":"%s","phase":"stage end","result":"failure"}\n' \
        "$(date +"%Y-%m-%dT%H:%M:%SZ" --utc)" "${SERVICE_NAME:-unknown}" \
        >> "${BOOTSTRAP_RECORD_DIR}/${SERVICE_NAME:-unknown}.log"
}
"#;

/// Pulls the release image until it succeeds
pub const RELEASE_IMAGE_DOWNLOAD_SH: &str = r#"#!/usr/bin/env bash
set -euo pipefail

. /usr/local/bin/release-image.sh
. /usr/local/bin/bootstrap-service-record.sh

record_service_stage_start "pull-release-image"
echo "Pulling ${RELEASE_IMAGE_DIGEST}..."
while ! podman pull --quiet "${RELEASE_IMAGE_DIGEST}"
do
    echo "Pull failed. Retrying ${RELEASE_IMAGE_DIGEST}..."
    sleep 5
done
record_service_stage_success
"#;

/// Reports bootstrap progress into /opt/openshift/.progress
pub const REPORT_PROGRESS_SH: &str = r#"#!/usr/bin/env bash
set -euo pipefail

PROGRESS_FILE=/opt/openshift/.progress

report_progress() {
    local status="$1"
    local message="$2"
    mkdir -p "$(dirname "${PROGRESS_FILE}")"
    echo "${status} ${message}" >> "${PROGRESS_FILE}"
}

report_progress "bootstrap" "cluster {{cluster_name}} bootstrap started"
"#;

/// Waits for the local etcd member to report healthy
pub const WAIT_FOR_ETCD_SH: &str = r#"#!/usr/bin/env bash
set -euo pipefail

. /usr/local/bin/bootstrap-service-record.sh

record_service_stage_start "wait-for-etcd"
echo "Waiting for etcd at {{etcd_endpoint}}..."
until curl --silent --fail --insecure "{{etcd_endpoint}}/health" | grep -q '"health":"true"'
do
    sleep 5
done
echo "etcd is healthy"
record_service_stage_success
"#;

/// Approves kubelet serving certificate requests during bootstrap
pub const APPROVE_CSR_SH: &str = r#"#!/usr/bin/env bash
set -uo pipefail

KUBECONFIG="${1:-/opt/openshift/auth/kubeconfig}"
export KUBECONFIG

echo "Approving pending CSRs for cluster {{cluster_name}}"
while true
do
    oc get csr --no-headers 2>/dev/null \
        | awk '$NF == "Pending" {print $1}' \
        | xargs --no-run-if-empty oc adm certificate approve
    sleep 20
done
"#;

pub const RELEASE_IMAGE_SERVICE: &str = r#"[Unit]
Description=Download the OpenShift Release Image
Wants=network-online.target
After=network-online.target

[Service]
Type=oneshot
Environment=SERVICE_NAME=release-image
ExecStart=/usr/local/bin/release-image-download.sh
RemainAfterExit=true

[Install]
WantedBy=multi-user.target
"#;

pub const PROGRESS_SERVICE: &str = r#"[Unit]
Description=Report the completion of the cluster bootstrap process
Wants=release-image.service
After=release-image.service

[Service]
Type=oneshot
Environment=SERVICE_NAME=progress
ExecStart=/usr/local/bin/report-progress.sh
RemainAfterExit=true

[Install]
WantedBy=multi-user.target
"#;

pub const WAIT_FOR_ETCD_SERVICE: &str = r#"[Unit]
Description=Wait for the bootstrap etcd member to become healthy
Wants=release-image.service
After=release-image.service

[Service]
Type=oneshot
Environment=SERVICE_NAME=wait-for-etcd
ExecStart=/usr/local/bin/wait-for-etcd.sh
RemainAfterExit=true
TimeoutStartSec=10min

[Install]
WantedBy=multi-user.target
"#;

pub const APPROVE_CSR_SERVICE: &str = r#"[Unit]
Description=Approve CSRs during bootstrap phase
Wants=wait-for-etcd.service
After=wait-for-etcd.service

[Service]
ExecStart=/usr/local/bin/approve-csr.sh /opt/openshift/auth/kubeconfig-loopback
Restart=on-failure
RestartSec=5s

[Install]
WantedBy=multi-user.target
"#;

pub const KUBELET_SERVICE: &str = r#"[Unit]
Description=Kubernetes Kubelet
Wants=rpc-statd.service crio.service release-image.service
After=crio.service release-image.service

[Service]
Type=notify
ExecStartPre=/bin/mkdir --parents /etc/kubernetes/manifests
EnvironmentFile=-/etc/kubernetes/kubelet-workaround
EnvironmentFile=-/etc/kubernetes/kubelet-env
ExecStart=/usr/bin/kubelet \
    --anonymous-auth=false \
    --container-runtime-endpoint=/var/run/crio/crio.sock \
    --runtime-request-timeout=10m \
    --pod-manifest-path=/etc/kubernetes/manifests \
    --minimum-container-ttl-duration=6m0s \
    --cluster-domain=cluster.local \
    --cgroup-driver=systemd \
    --serialize-image-pulls=false \
    --v=2
Restart=always
RestartSec=10

[Install]
WantedBy=multi-user.target
"#;

/// Files written under /usr/local/bin on the bootstrap node
pub const FILES: &[FileTemplate] = &[
    FileTemplate {
        path: "/usr/local/bin/release-image.sh",
        mode: 0o555,
        contents: RELEASE_IMAGE_SH,
    },
    FileTemplate {
        path: "/usr/local/bin/bootstrap-service-record.sh",
        mode: 0o555,
        contents: BOOTSTRAP_SERVICE_RECORD_SH,
    },
    FileTemplate {
        path: "/usr/local/bin/release-image-download.sh",
        mode: 0o555,
        contents: RELEASE_IMAGE_DOWNLOAD_SH,
    },
    FileTemplate {
        path: "/usr/local/bin/report-progress.sh",
        mode: 0o555,
        contents: REPORT_PROGRESS_SH,
    },
    FileTemplate {
        path: "/usr/local/bin/wait-for-etcd.sh",
        mode: 0o555,
        contents: WAIT_FOR_ETCD_SH,
    },
    FileTemplate {
        path: "/usr/local/bin/approve-csr.sh",
        mode: 0o555,
        contents: APPROVE_CSR_SH,
    },
];

/// Units installed on the bootstrap node
pub const UNITS: &[UnitTemplate] = &[
    UnitTemplate {
        name: "release-image.service",
        enabled: true,
        contents: RELEASE_IMAGE_SERVICE,
    },
    UnitTemplate {
        name: "progress.service",
        enabled: true,
        contents: PROGRESS_SERVICE,
    },
    UnitTemplate {
        name: "wait-for-etcd.service",
        enabled: true,
        contents: WAIT_FOR_ETCD_SERVICE,
    },
    UnitTemplate {
        name: "approve-csr.service",
        enabled: true,
        contents: APPROVE_CSR_SERVICE,
    },
    UnitTemplate {
        name: "kubelet.service",
        enabled: true,
        contents: KUBELET_SERVICE,
    },
];

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([a-z_][a-z0-9_]*)\s*\}\}").expect("valid regex"))
}

/// Names of the placeholders used by a template, in order of first use
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in placeholder().captures_iter(template) {
        if !names.iter().any(|n| n == &cap[1]) {
            names.push(cap[1].to_string());
        }
    }
    names
}

/// Replace every `{{name}}` with its value; a placeholder without a value is an error
pub fn render_template(template: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let missing: Vec<String> = placeholders(template)
        .into_iter()
        .filter(|name| !vars.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(InstallError::ignition(format!(
            "Template placeholders without a value: {}",
            missing.join(", ")
        )));
    }

    let rendered = placeholder().replace_all(template, |caps: &regex::Captures| {
        vars.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_template() {
        let rendered = render_template(
            "image={{release_image}} again={{ release_image }} shell=${HOME}",
            &vars(&[("release_image", "quay.io/x@sha256:abc")]),
        )
        .unwrap();
        assert_eq!(
            rendered,
            "image=quay.io/x@sha256:abc again=quay.io/x@sha256:abc shell=${HOME}"
        );
    }

    #[test]
    fn test_render_template_reports_all_missing() {
        let err = render_template("{{a}} {{b}} {{a}}", &vars(&[])).unwrap_err();
        assert!(matches!(err, InstallError::Ignition(_)));
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_every_template_uses_known_placeholders() {
        let known = ["release_image", "cluster_name", "etcd_endpoint"];
        let all = FILES
            .iter()
            .map(|f| f.contents)
            .chain(UNITS.iter().map(|u| u.contents));
        for contents in all {
            for name in placeholders(contents) {
                assert!(known.contains(&name.as_str()), "unknown placeholder {}", name);
            }
        }
    }

    #[test]
    fn test_scripts_are_executable_and_unique() {
        let mut paths: Vec<&str> = FILES.iter().map(|f| f.path).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), FILES.len());
        assert!(FILES
            .iter()
            .all(|f| f.mode == 0o555 && f.contents.starts_with("#!/usr/bin/env bash")));
        assert!(UNITS.iter().all(|u| u.contents.contains("[Install]")));
    }
}
