//! Compose specification → task definition conversion

use std::collections::BTreeMap;

use shipway_compose::{ComposeSpec, ServiceConfig};

use crate::error::{Result, ScheduleError};
use crate::task::{
    ContainerDefinition, HostEntry, KeyValuePair, LogConfiguration, MountPoint, PortMapping,
    TaskDefinition, UlimitDefinition, Volume, VolumeFrom,
};

const DEFAULT_MEMORY_MIB: i64 = 512;
const MIB: i64 = 1024 * 1024;

const LOG_DRIVER: &str = "awslogs";

const READ_ONLY_MODE: &str = "ro";
const READ_WRITE_MODE: &str = "rw";
const CONTAINER_KEY: &str = "container";

const VOLUME_NAME_PREFIX: &str = "volume";

/// Convert a prepared compose specification into a task definition.
///
/// Environment entries without a value (`- KEY`) resolve through the
/// process environment, defaulting to empty. Host-path volumes share one
/// generated volume table entry per host path across services.
pub fn convert_to_task_definition(
    spec: &ComposeSpec,
    family: &str,
    log_group: &str,
    region: &str,
) -> Result<TaskDefinition> {
    convert_with_lookup(spec, family, log_group, region, &|key| {
        std::env::var(key).ok()
    })
}

/// Conversion with an explicit environment lookup, for tests.
pub fn convert_with_lookup(
    spec: &ComposeSpec,
    family: &str,
    log_group: &str,
    region: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<TaskDefinition> {
    let mut container_definitions = Vec::new();
    let mut volume_names: BTreeMap<String, String> = BTreeMap::new();

    for (name, service) in spec.services() {
        container_definitions.push(convert_container(
            name,
            service,
            &mut volume_names,
            log_group,
            region,
            lookup,
        )?);
    }

    Ok(TaskDefinition {
        family: family.to_string(),
        container_definitions,
        volumes: volume_names
            .into_iter()
            .map(|(source_path, name)| Volume { name, source_path })
            .collect(),
    })
}

fn convert_container(
    name: &str,
    service: &ServiceConfig,
    volume_names: &mut BTreeMap<String, String>,
    log_group: &str,
    region: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<ContainerDefinition> {
    let mut memory = service.mem_limit.unwrap_or(0) / MIB;
    if memory == 0 {
        memory = DEFAULT_MEMORY_MIB;
    }

    let mut options = BTreeMap::new();
    options.insert("awslogs-group".to_string(), log_group.to_string());
    options.insert("awslogs-region".to_string(), region.to_string());

    Ok(ContainerDefinition {
        name: name.to_string(),
        image: service.image.clone().unwrap_or_default(),
        cpu: service.cpu_shares.unwrap_or(0),
        memory,
        environment: convert_environment(service, lookup),
        port_mappings: convert_port_mappings(&service.ports)?,
        volumes_from: convert_volumes_from(&service.volumes_from)?,
        mount_points: convert_mount_points(&service.volumes, volume_names)?,
        extra_hosts: convert_extra_hosts(&service.extra_hosts)?,
        links: service.links.clone(),
        ulimits: convert_ulimits(service),
        log_configuration: LogConfiguration {
            log_driver: LOG_DRIVER.to_string(),
            options,
        },
        hostname: service.hostname.clone(),
        user: service.user.clone(),
        working_directory: service.working_dir.clone(),
        privileged: service.privileged.unwrap_or(false),
        readonly_root_filesystem: service.read_only.unwrap_or(false),
    })
}

fn convert_environment(
    service: &ServiceConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Vec<KeyValuePair> {
    service
        .environment_map()
        .into_iter()
        .map(|(name, value)| {
            let value = if value.is_empty() {
                lookup(&name).unwrap_or_default()
            } else {
                value
            };
            KeyValuePair { name, value }
        })
        .collect()
}

fn convert_port_mappings(
    ports: &[shipway_compose::PortValue],
) -> Result<Vec<PortMapping>> {
    let mut mappings = Vec::new();

    for port in ports {
        let mut text = port.as_text();

        let mut protocol = "tcp".to_string();
        for candidate in ["tcp", "udp"] {
            if let Some(stripped) = text.strip_suffix(&format!("/{candidate}")) {
                protocol = candidate.to_string();
                text = stripped.to_string();
            }
        }

        let parts: Vec<&str> = text.split(':').collect();
        let parse = |s: &str| -> Result<i64> {
            s.parse()
                .map_err(|_| ScheduleError::PortMapping(port.as_text()))
        };

        let (host_port, container_port) = match parts.as_slice() {
            [container] => (0, parse(container)?),
            [host, container] => (parse(host)?, parse(container)?),
            [_ip, host, container] => (parse(host)?, parse(container)?),
            _ => return Err(ScheduleError::PortMapping(port.as_text())),
        };

        mappings.push(PortMapping {
            container_port,
            host_port,
            protocol,
        });
    }

    Ok(mappings)
}

fn convert_volumes_from(entries: &[String]) -> Result<Vec<VolumeFrom>> {
    let mut volumes_from = Vec::new();

    for entry in entries {
        let parts: Vec<&str> = entry.split(':').collect();

        let (container, mode) = match parts.as_slice() {
            [name] => (*name, ""),
            [first, second] => {
                if *first == CONTAINER_KEY {
                    (*second, "")
                } else {
                    (*first, *second)
                }
            }
            [first, name, mode] if *first == CONTAINER_KEY => (*name, *mode),
            _ => return Err(ScheduleError::VolumesFrom(entry.clone())),
        };

        volumes_from.push(VolumeFrom {
            source_container: container.to_string(),
            read_only: parse_access_mode(mode)?,
        });
    }

    Ok(volumes_from)
}

fn parse_access_mode(mode: &str) -> Result<bool> {
    match mode {
        "" | READ_WRITE_MODE => Ok(false),
        READ_ONLY_MODE => Ok(true),
        other => Err(ScheduleError::AccessMode(other.to_string())),
    }
}

fn convert_mount_points(
    volumes: &[String],
    volume_names: &mut BTreeMap<String, String>,
) -> Result<Vec<MountPoint>> {
    let mut mount_points = Vec::new();

    for volume in volumes {
        let parts: Vec<&str> = volume.split(':').collect();

        let (host_path, container_path, mode) = match parts.as_slice() {
            [container] => ("", *container, ""),
            [host, container] => (*host, *container, ""),
            [host, container, mode] => (*host, *container, *mode),
            _ => return Err(ScheduleError::Volume(volume.clone())),
        };

        let next_name = format!("{VOLUME_NAME_PREFIX}-{}", volume_names.len());
        let source_volume = volume_names
            .entry(host_path.to_string())
            .or_insert(next_name)
            .clone();

        mount_points.push(MountPoint {
            source_volume,
            container_path: container_path.to_string(),
            read_only: parse_access_mode(mode)?,
        });
    }

    Ok(mount_points)
}

fn convert_extra_hosts(entries: &[String]) -> Result<Vec<HostEntry>> {
    let mut hosts = Vec::new();

    for entry in entries {
        let (hostname, ip) = entry
            .split_once(':')
            .filter(|(h, ip)| !h.contains(':') && !ip.contains(':'))
            .ok_or_else(|| ScheduleError::ExtraHost(entry.clone()))?;

        hosts.push(HostEntry {
            hostname: hostname.to_string(),
            ip_address: ip.to_string(),
        });
    }

    Ok(hosts)
}

fn convert_ulimits(service: &ServiceConfig) -> Vec<UlimitDefinition> {
    service
        .ulimits
        .iter()
        .map(|(name, limit)| UlimitDefinition {
            name: name.clone(),
            soft_limit: limit.soft(),
            hard_limit: limit.hard(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn spec(yaml: &str) -> ComposeSpec {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        ComposeSpec::load(file.path()).unwrap()
    }

    fn convert(yaml: &str) -> Result<TaskDefinition> {
        convert_with_lookup(&spec(yaml), "family", "log-group", "us-east-1", &|key| {
            (key == "FROM_HOST").then(|| "resolved".to_string())
        })
    }

    #[test]
    fn defaults_memory_and_sets_log_configuration() {
        let def = convert("version: \"2\"\nservices:\n  web:\n    image: nginx\n").unwrap();
        let web = &def.container_definitions[0];

        assert_eq!(web.memory, 512);
        assert_eq!(web.log_configuration.log_driver, "awslogs");
        assert_eq!(
            web.log_configuration.options.get("awslogs-group").map(String::as_str),
            Some("log-group")
        );
    }

    #[test]
    fn converts_explicit_memory_bytes_to_mib() {
        let def = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    mem_limit: 268435456\n",
        )
        .unwrap();

        assert_eq!(def.container_definitions[0].memory, 256);
    }

    #[test]
    fn resolves_bare_environment_keys_through_lookup() {
        let def = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    environment:\n      - FROM_HOST\n      - MISSING\n      - SET=yes\n",
        )
        .unwrap();

        let env = &def.container_definitions[0].environment;
        let get = |name: &str| {
            env.iter()
                .find(|kv| kv.name == name)
                .map(|kv| kv.value.as_str())
        };

        assert_eq!(get("FROM_HOST"), Some("resolved"));
        assert_eq!(get("MISSING"), Some(""));
        assert_eq!(get("SET"), Some("yes"));
    }

    #[test]
    fn parses_all_port_mapping_shapes() {
        let def = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    ports:\n      - 8000\n      - \"8080:9090\"\n      - \"127.0.0.1:5000:6000\"\n      - \"53:53/udp\"\n",
        )
        .unwrap();

        let mappings = &def.container_definitions[0].port_mappings;
        assert_eq!(
            mappings[0],
            PortMapping { container_port: 8000, host_port: 0, protocol: "tcp".into() }
        );
        assert_eq!(
            mappings[1],
            PortMapping { container_port: 9090, host_port: 8080, protocol: "tcp".into() }
        );
        assert_eq!(
            mappings[2],
            PortMapping { container_port: 6000, host_port: 5000, protocol: "tcp".into() }
        );
        assert_eq!(
            mappings[3],
            PortMapping { container_port: 53, host_port: 53, protocol: "udp".into() }
        );
    }

    #[test]
    fn rejects_malformed_port_mappings() {
        let overlong = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    ports:\n      - \"1:2:3:4\"\n",
        );
        assert!(matches!(overlong, Err(ScheduleError::PortMapping(_))));

        let nonnumeric = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    ports:\n      - \"eighty:80\"\n",
        );
        assert!(matches!(nonnumeric, Err(ScheduleError::PortMapping(_))));
    }

    #[test]
    fn parses_volumes_from_forms() {
        let def = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    volumes_from:\n      - data\n      - cache:ro\n      - container:assets\n      - container:logs:rw\n",
        )
        .unwrap();

        let vf = &def.container_definitions[0].volumes_from;
        assert_eq!(vf[0], VolumeFrom { source_container: "data".into(), read_only: false });
        assert_eq!(vf[1], VolumeFrom { source_container: "cache".into(), read_only: true });
        assert_eq!(vf[2], VolumeFrom { source_container: "assets".into(), read_only: false });
        assert_eq!(vf[3], VolumeFrom { source_container: "logs".into(), read_only: false });
    }

    #[test]
    fn rejects_bad_volume_access_mode() {
        let result = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    volumes_from:\n      - data:rx\n",
        );
        assert!(matches!(result, Err(ScheduleError::AccessMode(_))));
    }

    #[test]
    fn deduplicates_mount_volumes_by_host_path() {
        let def = convert(
            "version: \"2\"\nservices:\n  a:\n    image: nginx\n    volumes:\n      - /data:/var/a\n  b:\n    image: nginx\n    volumes:\n      - /data:/var/b:ro\n      - /logs:/var/log\n",
        )
        .unwrap();

        assert_eq!(def.volumes.len(), 2);

        let a = &def.container_definitions[0].mount_points[0];
        let b = &def.container_definitions[1].mount_points[0];
        assert_eq!(a.source_volume, b.source_volume);
        assert!(b.read_only);
    }

    #[test]
    fn extra_hosts_require_exactly_two_segments() {
        let ok = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    extra_hosts:\n      - \"db:10.0.0.1\"\n",
        )
        .unwrap();
        assert_eq!(
            ok.container_definitions[0].extra_hosts[0],
            HostEntry { hostname: "db".into(), ip_address: "10.0.0.1".into() }
        );

        let bad = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    extra_hosts:\n      - \"db:10.0.0.1:9\"\n",
        );
        assert!(matches!(bad, Err(ScheduleError::ExtraHost(_))));
    }

    #[test]
    fn converts_ulimits() {
        let def = convert(
            "version: \"2\"\nservices:\n  web:\n    image: nginx\n    ulimits:\n      nofile:\n        soft: 1024\n        hard: 2048\n      nproc: 65535\n",
        )
        .unwrap();

        let ulimits = &def.container_definitions[0].ulimits;
        assert!(ulimits.contains(&UlimitDefinition {
            name: "nofile".into(),
            soft_limit: 1024,
            hard_limit: 2048
        }));
        assert!(ulimits.contains(&UlimitDefinition {
            name: "nproc".into(),
            soft_limit: 65535,
            hard_limit: 65535
        }));
    }
}
