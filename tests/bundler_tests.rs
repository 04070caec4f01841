use kodegen_bundler_dmg::bundler::platform::macos::DragNDropGenerator;
use kodegen_bundler_dmg::bundler::{
    CommandError, CommandOutput, CommandRunner, ErrorKind, GeneratorConfig, GeneratorState,
    InstallManifest, PackageGenerator, Stage, ToolCommand,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded `hdiutil` invocation plus what the staging directory held
/// at the moment it ran.
#[derive(Debug, Clone)]
struct Invocation {
    command: ToolCommand,
    staged: Vec<PathBuf>,
}

/// Stands in for `hdiutil`: records each call and, on success, writes a
/// small image to the output path.
struct RecordingRunner {
    exit_code: i32,
    output: &'static str,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    fn succeeding() -> Self {
        Self::exiting(0, "created: image.dmg")
    }

    fn exiting(exit_code: i32, output: &'static str) -> Self {
        Self {
            exit_code,
            output,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput, CommandError> {
        let srcfolder = Path::new(command.arg_value("-srcfolder").unwrap()).to_path_buf();
        let mut staged: Vec<PathBuf> = walkdir::WalkDir::new(&srcfolder)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap().path().strip_prefix(&srcfolder).unwrap().to_path_buf())
            .collect();
        staged.sort();

        self.calls.lock().unwrap().push(Invocation {
            command: command.clone(),
            staged,
        });

        if self.exit_code == 0 {
            let out = command.get_args().last().unwrap();
            std::fs::write(out, b"fake disk image").unwrap();
        }
        Ok(CommandOutput {
            exit_code: Some(self.exit_code),
            output: self.output.to_string(),
        })
    }
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("build")).unwrap();
        std::fs::create_dir_all(dir.path().join("staging-root")).unwrap();
        Self { dir }
    }

    fn source(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join("build").join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("dist/MyApp.dmg")
    }

    fn staging_root(&self) -> PathBuf {
        self.dir.path().join("staging-root")
    }

    fn config(&self) -> GeneratorConfig {
        GeneratorConfig::new()
            .volume_name("MyApp")
            .output_path(self.output())
            .hdiutil("/usr/bin/hdiutil")
            .staging_root(self.staging_root())
    }

    fn leftover_staging_dirs(&self) -> usize {
        std::fs::read_dir(self.staging_root()).unwrap().count()
    }
}

#[tokio::test]
async fn test_two_files_staged_and_imaged_once() {
    let fx = Fixture::new();
    let manifest = InstallManifest::new()
        .with_entry(fx.source("a.txt", "alpha"), "bin/a.txt")
        .with_entry(fx.source("b.txt", "beta"), "bin/b.txt");

    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    let settings = generator.initialize(&fx.config()).unwrap();
    let artifact = generator.package_files(&settings, &manifest).await.unwrap();

    assert_eq!(artifact.path, fx.output());
    assert_eq!(artifact.generator, "DragNDrop");
    assert_eq!(artifact.size, b"fake disk image".len() as u64);
    assert_eq!(artifact.checksum.len(), 64);
    assert_eq!(generator.state(), GeneratorState::Completed);

    let calls = generator.runner().calls();
    assert_eq!(calls.len(), 1);
    let staged = &calls[0].staged;
    assert!(staged.contains(&PathBuf::from("bin/a.txt")));
    assert!(staged.contains(&PathBuf::from("bin/b.txt")));
    #[cfg(unix)]
    assert!(staged.contains(&PathBuf::from("Applications")));

    let command = &calls[0].command;
    assert_eq!(command.get_args()[0], "create");
    assert_eq!(command.arg_value("-volname").unwrap(), "MyApp");
    assert_eq!(command.arg_value("-format").unwrap(), "UDZO");

    assert_eq!(fx.leftover_staging_dirs(), 0);
}

#[tokio::test]
async fn test_unreadable_entry_stops_before_hdiutil() {
    let fx = Fixture::new();
    let manifest = InstallManifest::new()
        .with_entry(fx.source("a.txt", "alpha"), "bin/a.txt")
        .with_entry(fx.dir.path().join("build/missing.txt"), "bin/missing.txt");

    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    let settings = generator.initialize(&fx.config()).unwrap();
    let err = generator.package_files(&settings, &manifest).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(err.stage(), Some(Stage::Staging));
    assert!(err.to_string().contains("missing.txt"));
    assert_eq!(generator.state(), GeneratorState::Failed(Stage::Staging));
    assert!(generator.runner().calls().is_empty());
    assert!(!fx.output().exists());
    assert_eq!(fx.leftover_staging_dirs(), 0);
}

#[tokio::test]
async fn test_hdiutil_failure_surfaces_output() {
    let fx = Fixture::new();
    let manifest = InstallManifest::new().with_entry(fx.source("a.txt", "alpha"), "a.txt");

    let runner = RecordingRunner::exiting(2, "hdiutil: create failed - Resource busy");
    let mut generator = DragNDropGenerator::with_runner(runner);
    let settings = generator.initialize(&fx.config()).unwrap();
    let err = generator.package_files(&settings, &manifest).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Command);
    assert_eq!(err.stage(), Some(Stage::Building));
    assert!(err.command_output().unwrap().contains("Resource busy"));
    assert_eq!(generator.state(), GeneratorState::Failed(Stage::Building));
    assert_eq!(generator.runner().calls().len(), 1);
    assert_eq!(fx.leftover_staging_dirs(), 0);
}

#[tokio::test]
async fn test_empty_manifest_still_builds() {
    let fx = Fixture::new();
    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    let settings = generator
        .initialize(&fx.config().applications_symlink(false))
        .unwrap();
    let artifact = generator
        .package_files(&settings, &InstallManifest::new())
        .await
        .unwrap();

    assert!(artifact.path.exists());
    let calls = generator.runner().calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].staged.is_empty());
}

#[tokio::test]
async fn test_install_prefix_and_format_reach_hdiutil() {
    let fx = Fixture::new();
    let manifest = InstallManifest::new().with_entry(fx.source("tool", "bin"), "bin/tool");

    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    let settings = generator
        .initialize(
            &fx.config()
                .install_prefix("/MyApp")
                .compression_format("lzfse")
                .applications_symlink(false),
        )
        .unwrap();
    generator.package_files(&settings, &manifest).await.unwrap();

    let calls = generator.runner().calls();
    assert!(calls[0].staged.contains(&PathBuf::from("MyApp/bin/tool")));
    assert_eq!(calls[0].command.arg_value("-format").unwrap(), "ULFO");
    assert!(!calls[0].command.has_arg("-imagekey"));
}

#[tokio::test]
async fn test_keep_staging_leaves_directory() {
    let fx = Fixture::new();
    let manifest = InstallManifest::new().with_entry(fx.source("a.txt", "alpha"), "a.txt");

    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    let settings = generator
        .initialize(&fx.config().keep_staging(true))
        .unwrap();
    generator.package_files(&settings, &manifest).await.unwrap();

    assert_eq!(fx.leftover_staging_dirs(), 1);
}

#[tokio::test]
async fn test_output_extension_constant_across_lifecycle() {
    let fx = Fixture::new();
    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    assert_eq!(generator.output_extension(), ".dmg");

    let settings = generator.initialize(&fx.config()).unwrap();
    assert_eq!(generator.output_extension(), ".dmg");

    generator
        .package_files(&settings, &InstallManifest::new())
        .await
        .unwrap();
    assert_eq!(generator.output_extension(), ".dmg");
}

#[tokio::test]
async fn test_generator_reused_for_second_package() {
    let fx = Fixture::new();
    let manifest = InstallManifest::new().with_entry(fx.source("a.txt", "alpha"), "a.txt");

    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    let settings = generator.initialize(&fx.config()).unwrap();

    let first = generator.package_files(&settings, &manifest).await.unwrap();
    assert_eq!(generator.state(), GeneratorState::Completed);
    let second = generator.package_files(&settings, &manifest).await.unwrap();

    assert_eq!(first.path, second.path);
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(generator.state(), GeneratorState::Completed);

    let calls = generator.runner().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].staged, calls[1].staged);
    assert_ne!(
        calls[0].command.arg_value("-srcfolder"),
        calls[1].command.arg_value("-srcfolder")
    );
    assert_eq!(fx.leftover_staging_dirs(), 0);
}

#[tokio::test]
async fn test_applications_destination_conflicts_with_symlink() {
    let fx = Fixture::new();
    let manifest = InstallManifest::new()
        .with_entry(fx.source("a.txt", "alpha"), "a.txt")
        .with_entry(fx.source("readme.txt", "read me"), "Applications/readme.txt");

    let mut generator = DragNDropGenerator::with_runner(RecordingRunner::succeeding());
    let settings = generator.initialize(&fx.config()).unwrap();
    let err = generator.package_files(&settings, &manifest).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(err.stage(), Some(Stage::Staging));
    assert!(err.to_string().contains("applications_symlink"));
    assert!(generator.runner().calls().is_empty());
    assert_eq!(fx.leftover_staging_dirs(), 0);

    // Without the symlink the same manifest packages fine.
    let settings = generator
        .initialize(&fx.config().applications_symlink(false))
        .unwrap();
    generator.package_files(&settings, &manifest).await.unwrap();
    let calls = generator.runner().calls();
    assert!(calls[0].staged.contains(&PathBuf::from("Applications/readme.txt")));
}

#[cfg(unix)]
mod fake_hdiutil {
    use super::*;
    use kodegen_bundler_dmg::bundler::platform;
    use std::os::unix::fs::PermissionsExt;

    /// Writes an executable shell script that behaves like `hdiutil create`.
    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("hdiutil");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_real_process_produces_image() {
        let fx = Fixture::new();
        let hdiutil = script(
            fx.dir.path(),
            r#"for last; do :; done
printf 'fake disk image' > "$last""#,
        );
        let manifest = InstallManifest::new().with_entry(fx.source("a.txt", "alpha"), "a.txt");

        let mut generator = platform::create("dmg").unwrap();
        let settings = generator.initialize(&fx.config().hdiutil(&hdiutil)).unwrap();
        let artifact = generator.package_files(&settings, &manifest).await.unwrap();

        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"fake disk image");
        assert_eq!(generator.state(), GeneratorState::Completed);
        assert_eq!(fx.leftover_staging_dirs(), 0);
    }

    #[tokio::test]
    async fn test_zero_exit_without_image_is_command_error() {
        let fx = Fixture::new();
        let hdiutil = script(fx.dir.path(), "echo 'pretending to succeed'");

        let mut generator = platform::create("DragNDrop").unwrap();
        let settings = generator.initialize(&fx.config().hdiutil(&hdiutil)).unwrap();
        let err = generator
            .package_files(&settings, &InstallManifest::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Command);
        assert!(err.command_output().unwrap().contains("pretending to succeed"));
    }

    #[tokio::test]
    async fn test_timeout_kills_hung_hdiutil() {
        let fx = Fixture::new();
        let hdiutil = script(fx.dir.path(), "sleep 10");

        let mut generator = platform::create("DragNDrop").unwrap();
        let settings = generator
            .initialize(&fx.config().hdiutil(&hdiutil).timeout_secs(1))
            .unwrap();
        let err = generator
            .package_files(&settings, &InstallManifest::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Command);
        assert_eq!(err.stage(), Some(Stage::Building));
        assert_eq!(fx.leftover_staging_dirs(), 0);
    }
}
