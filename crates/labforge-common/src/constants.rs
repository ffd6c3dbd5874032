//! Workspace-wide constants.

/// Subnet assumed when a lab omits its `network` clause.
pub const DEFAULT_SUBNET: &str = "10.0.0.0/8";

/// Schema version written into the deployment descriptor.
pub const DESCRIPTOR_VERSION: &str = "3.8";

/// Suffix appended to the lab name to form the network name.
pub const NETWORK_SUFFIX: &str = "_network";

/// Volume mount every service receives.
pub const WORKSPACE_VOLUME: &str = "./:/workspace";

/// Directory inside the container where the workspace is mounted.
pub const WORKSPACE_DIR: &str = "/workspace";

/// Shell used to run a node's entrypoint script.
pub const ENTRYPOINT_SHELL: &str = "/bin/bash";

/// Host interface name given to the lab's bridge network.
pub const BRIDGE_IFACE: &str = "br-labforge";

/// Docker's built-in networks, which are never removable.
pub const BUILTIN_NETWORKS: [&str; 3] = ["none", "host", "bridge"];

/// Default lab definition file read by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Default deployment descriptor file written by the CLI.
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
