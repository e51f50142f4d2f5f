use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_VPPTOOL_TOML_NAME: &str = "vpptool.toml";

pub const DEFAULT_CONTEXT: &str = "https://github.com/filvarga/vpptool.git#develop:docker";
pub const DEFAULT_IMAGE: &str = "vpptool-images";
pub const DEFAULT_SETUP_TAG: &str = "setup";
pub const DEFAULT_BUILD_TAG: &str = "build";
pub const DEFAULT_TRANSIENT_CONTAINER: &str = "vpptool-container";
pub const DEFAULT_DEPLOY_NAME: &str = "vpp-run";

pub fn default_config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
        .join(".config/vpptool")
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ImagesConfig {
    pub setup_image: Option<String>,
    pub setup_tag: Option<String>,
    pub build_image: Option<String>,
    pub build_tag: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Build context handed to the engine (URL or local path)
    pub context: Option<String>,
    /// Name of the transient container used by setup/cache/build
    pub container: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct UserConfig {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub git_name: Option<String>,
    pub git_mail: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub name: Option<String>,
    pub plugin: Option<PathBuf>,
    pub startup_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub running: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub engine: Option<String>,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
}

fn overwrite<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl AppConfig {
    /// Merges another AppConfig into self.
    /// Values from `other` overwrite values in `self` if present.
    pub fn merge(&mut self, other: AppConfig) {
        overwrite(&mut self.engine, other.engine);

        overwrite(&mut self.images.setup_image, other.images.setup_image);
        overwrite(&mut self.images.setup_tag, other.images.setup_tag);
        overwrite(&mut self.images.build_image, other.images.build_image);
        overwrite(&mut self.images.build_tag, other.images.build_tag);

        overwrite(&mut self.build.context, other.build.context);
        overwrite(&mut self.build.container, other.build.container);

        overwrite(&mut self.user.uid, other.user.uid);
        overwrite(&mut self.user.gid, other.user.gid);
        overwrite(&mut self.user.git_name, other.user.git_name);
        overwrite(&mut self.user.git_mail, other.user.git_mail);

        overwrite(&mut self.deploy.name, other.deploy.name);
        overwrite(&mut self.deploy.plugin, other.deploy.plugin);
        overwrite(&mut self.deploy.startup_file, other.deploy.startup_file);
        overwrite(&mut self.deploy.config_file, other.deploy.config_file);
        overwrite(&mut self.deploy.running, other.deploy.running);
    }

    fn fill_defaults(&mut self) {
        let defaults = [
            (&mut self.engine, crate::infra::docker_adapter::DEFAULT_ENGINE),
            (&mut self.images.setup_image, DEFAULT_IMAGE),
            (&mut self.images.setup_tag, DEFAULT_SETUP_TAG),
            (&mut self.images.build_image, DEFAULT_IMAGE),
            (&mut self.images.build_tag, DEFAULT_BUILD_TAG),
            (&mut self.build.context, DEFAULT_CONTEXT),
            (&mut self.build.container, DEFAULT_TRANSIENT_CONTAINER),
            (&mut self.deploy.name, DEFAULT_DEPLOY_NAME),
        ];

        for (field, value) in defaults {
            field.get_or_insert_with(|| value.to_string());
        }
    }
}

fn read_config(path: &Path) -> Result<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = toml::from_str(&content).with_context(|| format!("parsing {:?}", path))?;

    Ok(Some(config))
}

/// Loads `vpptool.toml` from the config dir, overlays the one in the working directory
pub fn load_app_config(config_dir: &Path) -> Result<AppConfig> {
    load_app_config_with_local(config_dir, Path::new("./"))
}

pub fn load_app_config_with_local(config_dir: &Path, local_dir: &Path) -> Result<AppConfig> {
    let mut app_config = read_config(&config_dir.join(DEFAULT_VPPTOOL_TOML_NAME))?
        .unwrap_or_default();

    if let Some(local) = read_config(&local_dir.join(DEFAULT_VPPTOOL_TOML_NAME))? {
        app_config.merge(local);
    }

    app_config.fill_defaults();

    Ok(app_config)
}

/// Expands a leading `~` the way a shell would
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.to_string_lossy().as_ref()).into_owned())
}

/// Anchors a relative path at the working directory
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("reading the working directory")?;
    Ok(absolute_from(path, &cwd))
}

/// Joins `path` onto `base` and folds `.` and `..` without touching the filesystem
pub fn absolute_from(path: &Path, base: &Path) -> PathBuf {
    let mut absolute = PathBuf::new();

    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                absolute.pop();
            }
            other => absolute.push(other),
        }
    }

    absolute
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let toml = r#"
engine = "podman"

[images]
setup_image = "vpp-dev"
setup_tag = "base"

[build]
context = "/home/dev/vpptool/docker"

[user]
uid = 1001
git_name = "Dev"

[deploy]
plugin = "~/code/acl"
running = true
"#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.engine.as_deref(), Some("podman"));
        assert_eq!(config.images.setup_image.as_deref(), Some("vpp-dev"));
        assert_eq!(config.images.build_tag, None);
        assert_eq!(config.user.uid, Some(1001));
        assert_eq!(config.deploy.plugin, Some(PathBuf::from("~/code/acl")));
        assert_eq!(config.deploy.running, Some(true));
    }

    #[test]
    fn rejects_unknown_value_types() {
        let result = toml::from_str::<AppConfig>("[user]\nuid = \"root\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn merge_prefers_other_values() {
        let mut base: AppConfig = toml::from_str(
            r#"
[images]
setup_tag = "setup"
build_tag = "build"
"#,
        )
        .unwrap();
        let local: AppConfig = toml::from_str("[images]\nbuild_tag = \"dev\"\n").unwrap();

        base.merge(local);
        assert_eq!(base.images.setup_tag.as_deref(), Some("setup"));
        assert_eq!(base.images.build_tag.as_deref(), Some("dev"));
    }

    #[test]
    fn fills_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_app_config_with_local(dir.path(), dir.path()).unwrap();

        assert_eq!(config.engine.as_deref(), Some("docker"));
        assert_eq!(config.images.setup_image.as_deref(), Some(DEFAULT_IMAGE));
        assert_eq!(config.images.setup_tag.as_deref(), Some("setup"));
        assert_eq!(config.images.build_tag.as_deref(), Some("build"));
        assert_eq!(config.build.context.as_deref(), Some(DEFAULT_CONTEXT));
        assert_eq!(
            config.build.container.as_deref(),
            Some(DEFAULT_TRANSIENT_CONTAINER)
        );
        assert_eq!(config.deploy.name.as_deref(), Some(DEFAULT_DEPLOY_NAME));
        assert_eq!(config.user.uid, None);
    }

    #[test]
    fn local_config_overrides_global() {
        let global = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();

        fs::write(
            global.path().join(DEFAULT_VPPTOOL_TOML_NAME),
            "[deploy]\nname = \"vpp-a\"\n[build]\ncontext = \"/ctx\"\n",
        )
        .unwrap();
        fs::write(
            local.path().join(DEFAULT_VPPTOOL_TOML_NAME),
            "[deploy]\nname = \"vpp-b\"\n",
        )
        .unwrap();

        let config = load_app_config_with_local(global.path(), local.path()).unwrap();
        assert_eq!(config.deploy.name.as_deref(), Some("vpp-b"));
        assert_eq!(config.build.context.as_deref(), Some("/ctx"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_VPPTOOL_TOML_NAME), "engine = [").unwrap();

        let err = load_app_config_with_local(dir.path(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("vpptool.toml"));
    }

    #[test]
    fn relative_paths_are_anchored_at_base() {
        let base = Path::new("/home/dev/plugins/acl");

        assert_eq!(
            absolute_from(Path::new("acl"), Path::new("/home/dev/plugins")),
            PathBuf::from("/home/dev/plugins/acl")
        );
        assert_eq!(absolute_from(Path::new("."), base), PathBuf::from("/home/dev/plugins/acl"));
        assert_eq!(
            absolute_from(Path::new("../nat"), base),
            PathBuf::from("/home/dev/plugins/nat")
        );
        assert_eq!(
            absolute_from(Path::new("/src/./acl/"), base),
            PathBuf::from("/src/acl")
        );
        assert_eq!(absolute_from(Path::new("../../../.."), base), PathBuf::from("/"));
    }

    #[test]
    fn expands_tilde() {
        let expanded = expand_path(Path::new("/abs/path"));
        assert_eq!(expanded, PathBuf::from("/abs/path"));

        let home = std::env::var("HOME").unwrap_or_default();
        if !home.is_empty() {
            assert_eq!(expand_path(Path::new("~/code")), Path::new(&home).join("code"));
        }
    }
}
