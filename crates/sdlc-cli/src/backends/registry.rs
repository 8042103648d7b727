//! Generator registry: binds generators to command-line switches.
//!
//! Registration declares, for each generator, an activation switch
//! (`--<name>_out=<dir>`) and an optional options switch
//! (`--<name>_opt=<json>`). Resolution happens in two decoupled steps: the
//! registry first produces a [`SwitchSchema`] that is added to the clap
//! command, and after clap has parsed the arguments the schema turns the
//! matches into ordered [`RegistryEntry`] values.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory};
use serde_json::Value;

use crate::backends::subprocess::{PluginGenerator, SubprocessConfig};
use crate::compiler::Cli;
use crate::generator::{Generator, GeneratorOptions};

/// Help heading the generator switches are grouped under.
pub const GENERATOR_HEADING: &str = "Generator Flags";

/// Errors from registering generators or resolving their switches.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// A switch name is already bound to another generator.
    DuplicateGenerator(String),
    /// An options switch was given without its activation switch.
    DanglingOptions { opt_switch: String, out_switch: String },
    /// An options switch value is not a JSON object.
    InvalidOptions { switch: String, reason: String },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateGenerator(switch) => {
                write!(f, "Switch '--{}' is already bound to a generator", switch)
            }
            Self::DanglingOptions {
                opt_switch,
                out_switch,
            } => write!(
                f,
                "'--{}' was given without '--{}'; options need an activated generator",
                opt_switch, out_switch
            ),
            Self::InvalidOptions { switch, reason } => {
                write!(f, "Invalid value for '--{}': {}", switch, reason)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// One generator bound to its switches.
#[derive(Debug, Clone)]
pub struct SwitchBinding {
    pub generator: Arc<dyn Generator>,
    /// Generator name, the activation switch without its `_out` suffix.
    pub name: String,
    pub out_switch: String,
    pub opt_switch: Option<String>,
    pub help: String,
    /// True for plugins discovered from the command line.
    pub discovered: bool,
}

/// A generator's configuration for one run.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub generator: Arc<dyn Generator>,
    pub name: String,
    /// Output directory. Empty unless activated.
    pub out_dir: PathBuf,
    pub options: GeneratorOptions,
    /// Whether the activation switch was present.
    pub activated: bool,
}

/// Registry of generators, kept in registration order.
#[derive(Debug, Default)]
pub struct GeneratorRegistry {
    bindings: Vec<SwitchBinding>,
    plugin_prefix: Option<String>,
    plugin_config: SubprocessConfig,
}

impl GeneratorRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a generator under an activation switch and an optional
    /// options switch. Switch names are given without the leading `--` and
    /// may not collide with another generator or a global switch.
    pub fn register(
        &mut self,
        generator: Arc<dyn Generator>,
        out_switch: &str,
        opt_switch: Option<&str>,
        help: &str,
    ) -> Result<(), RegistryError> {
        if opt_switch == Some(out_switch) {
            return Err(RegistryError::DuplicateGenerator(out_switch.to_string()));
        }
        for switch in std::iter::once(out_switch).chain(opt_switch) {
            if self.is_bound(switch) || is_global_switch(switch) {
                return Err(RegistryError::DuplicateGenerator(switch.to_string()));
            }
        }

        self.bindings.push(SwitchBinding {
            generator,
            name: generator_name(out_switch).to_string(),
            out_switch: out_switch.to_string(),
            opt_switch: opt_switch.map(str::to_string),
            help: help.to_string(),
            discovered: false,
        });
        Ok(())
    }

    /// Binds unregistered `--<name>_out` / `--<name>_opt` switches to
    /// plugin executables named `<prefix><name>`.
    pub fn allow_plugins(&mut self, prefix: impl Into<String>) {
        self.plugin_prefix = Some(prefix.into());
    }

    /// Sets the configuration used for discovered plugins.
    pub fn set_plugin_config(&mut self, config: SubprocessConfig) {
        self.plugin_config = config;
    }

    pub fn plugin_prefix(&self) -> Option<&str> {
        self.plugin_prefix.as_deref()
    }

    fn is_bound(&self, switch: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.out_switch == switch || b.opt_switch.as_deref() == Some(switch))
    }

    /// Returns the switch schema for a command line: every registered
    /// generator followed by any plugins the arguments name.
    pub fn switch_schema<S: AsRef<str>>(&self, args: &[S]) -> SwitchSchema {
        let mut bindings = self.bindings.clone();

        if let Some(prefix) = &self.plugin_prefix {
            for name in plugin_names(args) {
                let out_switch = format!("{}_out", name);
                let opt_switch = format!("{}_opt", name);
                let taken = bindings.iter().any(|b| {
                    [&out_switch, &opt_switch].iter().any(|s| {
                        b.out_switch == **s || b.opt_switch.as_deref() == Some(s.as_str())
                    })
                });
                if taken {
                    continue;
                }

                let generator =
                    PluginGenerator::with_config(prefix.clone(), name.clone(), self.plugin_config.clone());
                bindings.push(SwitchBinding {
                    help: format!("Generate output with the {} plugin", generator.executable_name()),
                    generator: Arc::new(generator),
                    name,
                    out_switch,
                    opt_switch: Some(opt_switch),
                    discovered: true,
                });
            }
        }

        SwitchSchema { bindings }
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Registered generator names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.name.as_str())
    }
}

/// True if `switch` is taken by the compiler's own arguments, including the
/// `help` and `version` flags clap adds when the command is built.
fn is_global_switch(switch: &str) -> bool {
    if matches!(switch, "help" | "version") {
        return true;
    }
    Cli::command()
        .get_arguments()
        .any(|arg| arg.get_id() == switch || arg.get_long() == Some(switch))
}

fn generator_name(out_switch: &str) -> &str {
    out_switch.strip_suffix("_out").unwrap_or(out_switch)
}

fn is_plugin_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Names from `--<name>_out` / `--<name>_opt` tokens, in order of first
/// appearance. Scanning stops at a bare `--`.
fn plugin_names<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for arg in args {
        let arg = arg.as_ref();
        if arg == "--" {
            break;
        }
        let Some(flag) = arg.strip_prefix("--") else {
            continue;
        };
        let flag = flag.split_once('=').map_or(flag, |(name, _)| name);
        let name = flag
            .strip_suffix("_out")
            .or_else(|| flag.strip_suffix("_opt"));
        if let Some(name) = name {
            if is_plugin_name(name) && !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// The generator switches for one command line.
#[derive(Debug, Clone)]
pub struct SwitchSchema {
    bindings: Vec<SwitchBinding>,
}

impl SwitchSchema {
    pub fn bindings(&self) -> &[SwitchBinding] {
        &self.bindings
    }

    /// Adds every generator switch to `cmd`. Repeated switches keep the last
    /// value.
    pub fn augment(&self, cmd: Command) -> Command {
        let mut cmd = cmd.args_override_self(true);
        for binding in &self.bindings {
            cmd = cmd.arg(
                Arg::new(binding.out_switch.clone())
                    .long(binding.out_switch.clone())
                    .value_name("OUT_DIR")
                    .help(binding.help.clone())
                    .help_heading(GENERATOR_HEADING)
                    .action(ArgAction::Set),
            );
            if let Some(opt) = &binding.opt_switch {
                cmd = cmd.arg(
                    Arg::new(opt.clone())
                        .long(opt.clone())
                        .value_name("JSON")
                        .help(format!("Options for the {} generator (JSON object)", binding.name))
                        .help_heading(GENERATOR_HEADING)
                        .action(ArgAction::Set),
                );
            }
        }
        cmd
    }

    /// Turns parsed switches into registry entries, in binding order.
    pub fn resolve(&self, matches: &ArgMatches) -> Result<Vec<RegistryEntry>, RegistryError> {
        let mut entries = Vec::with_capacity(self.bindings.len());

        for binding in &self.bindings {
            let out_dir = string_value(matches, &binding.out_switch);
            let options = match &binding.opt_switch {
                Some(opt) => string_value(matches, opt).map(|raw| (opt, raw)),
                None => None,
            };

            let options = match (&out_dir, options) {
                (None, Some((opt, _))) => {
                    return Err(RegistryError::DanglingOptions {
                        opt_switch: opt.clone(),
                        out_switch: binding.out_switch.clone(),
                    });
                }
                (_, Some((opt, raw))) => parse_options(opt, &raw)?,
                (_, None) => GeneratorOptions::new(),
            };

            entries.push(RegistryEntry {
                generator: Arc::clone(&binding.generator),
                name: binding.name.clone(),
                activated: out_dir.is_some(),
                out_dir: out_dir.map(PathBuf::from).unwrap_or_default(),
                options,
            });
        }

        Ok(entries)
    }
}

fn string_value(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

fn parse_options(switch: &str, raw: &str) -> Result<GeneratorOptions, RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidOptions {
        switch: switch.to_string(),
        reason,
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(invalid(format!("expected a JSON object, got {}", other))),
        Err(e) => Err(invalid(e.to_string())),
    }
}
