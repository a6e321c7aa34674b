//! End-to-end runs through the real namespace sandbox.
//!
//! These need unprivileged user namespaces and are ignored by default:
//! `cargo test -- --ignored`

use std::path::{Path, PathBuf};
use std::time::Duration;

use code_runner::adapter::FileSettings;
use code_runner::core::ExecError;
use code_runner::engine::{Engine, EngineConfig};
use code_runner::languages::Languages;
use code_runner::sandbox::init::SETUP_FAILED_EXIT;
use tempfile::TempDir;

/// Engine running everything through `sandbox-init`, chrooted into `root`.
/// `languages` is extra TOML; `{work}` in it names the scratch directory.
fn engine_with_root(dir: &TempDir, root: &Path, languages: &str) -> Engine {
    let work_dir = dir.path().join("runner_files");
    let log_dir = dir.path().join("serverOutput");
    std::fs::create_dir_all(&log_dir).unwrap();

    let table = format!(
        "[shell]\nextension = \"sh\"\ndirectory = \"{work}\"\nrun_command = \"sh\"\n{extra}",
        work = work_dir.display(),
        extra = languages
    );
    let languages = Languages::parse(&table).unwrap();

    let config = EngineConfig {
        timeout: Duration::from_secs(5),
        log_dir,
        root: root.to_path_buf(),
        runner: PathBuf::from(env!("CARGO_BIN_EXE_sandbox-init")),
    };
    Engine::new(config, &languages)
}

fn sandboxed_engine() -> (TempDir, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_root(&dir, Path::new("/"), "");
    (dir, engine)
}

/// Copy `program` and the shared libraries it loads into `root`
fn install(root: &Path, program: &str) {
    let path = ["/bin", "/usr/bin"]
        .iter()
        .map(|dir| Path::new(dir).join(program))
        .find(|p| p.exists())
        .unwrap();
    copy_into(root, &path);

    let ldd = std::process::Command::new("ldd").arg(&path).output().unwrap();
    for lib in String::from_utf8_lossy(&ldd.stdout)
        .split_whitespace()
        .filter(|word| word.starts_with('/'))
    {
        copy_into(root, Path::new(lib));
    }
}

fn copy_into(root: &Path, path: &Path) {
    let dest = root.join(path.strip_prefix("/").unwrap());
    std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
    std::fs::copy(path, &dest).unwrap();
}

#[tokio::test]
#[ignore]
async fn namespace_root_maps_to_invoking_user() {
    let (_dir, engine) = sandboxed_engine();
    let uid = nix::unistd::getuid().as_raw();

    let output = engine
        .execute("shell", "cat /proc/self/uid_map", None)
        .await
        .unwrap();

    let fields: Vec<&str> = output.split_whitespace().collect();
    assert_eq!(fields, vec!["0", uid.to_string().as_str(), "1"]);
}

#[tokio::test]
#[ignore]
async fn sandbox_has_its_own_hostname_and_pid_space() {
    let (_dir, engine) = sandboxed_engine();

    let output = engine
        .execute(
            "shell",
            "cat /proc/sys/kernel/hostname\necho $$",
            Some(FileSettings::with_prefix("ns-check")),
        )
        .await
        .unwrap();

    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines, vec!["sandbox", "1"]);
}

#[tokio::test]
#[ignore]
async fn host_root_files_stay_read_only() {
    if nix::unistd::geteuid().is_root() {
        return;
    }
    let (_dir, engine) = sandboxed_engine();

    let output = engine
        .execute(
            "shell",
            "if echo x > /etc/sandbox-probe 2>/dev/null; then echo wrote; else echo denied; fi",
            None,
        )
        .await
        .unwrap();

    assert_eq!(output, "denied\n");
}

#[tokio::test]
#[ignore]
async fn endless_sandbox_is_killed_at_deadline() {
    let (_dir, engine) = sandboxed_engine();

    let result = engine
        .execute("shell", "printf started\nwhile :; do :; done", None)
        .await;

    match result {
        Err(ExecError::TimeLimitExceeded { output, .. }) => assert_eq!(output, "started"),
        other => panic!("expected time limit, got {:?}", other),
    }
}

#[tokio::test]
#[ignore]
async fn compiler_cannot_read_host_files() {
    let dir = tempfile::tempdir().unwrap();
    let secret = dir.path().join("secret.txt");
    std::fs::write(&secret, "TOP-SECRET-HOST-TOKEN\n").unwrap();

    let root = dir.path().join("root");
    install(&root, "cat");

    // "Compiling" with cat echoes every file the compiler can open.
    let engine = engine_with_root(
        &dir,
        &root,
        &format!(
            "[leaky]\nextension = \"c\"\ndirectory = \"{}\"\ncompile_command = \"cat {{source}} {}\"\n",
            root.join("runner_files").display(),
            secret.display()
        ),
    );

    let result = engine
        .execute("leaky", "#include \"/etc/passwd\"", None)
        .await;

    match result {
        Err(ExecError::Compilation { message }) => {
            assert!(message.contains("secret.txt"), "{}", message);
            assert!(!message.contains("TOP-SECRET"), "{}", message);
        }
        other => panic!("expected compilation error, got {:?}", other),
    }
    assert!(!root.join("runner_files").read_dir().unwrap().any(|_| true));
}

#[tokio::test]
#[ignore]
async fn failed_setup_never_runs_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file cannot hold the proc mount point.
    let root = dir.path().join("not-a-directory");
    std::fs::write(&root, "").unwrap();
    let marker = dir.path().join("marker");

    let engine = engine_with_root(&dir, &root, "");
    let result = engine
        .execute("shell", format!("touch {}", marker.display()), None)
        .await;

    match result {
        Err(ExecError::Runtime { message, output }) => {
            assert!(
                message.contains(&SETUP_FAILED_EXIT.to_string()),
                "{}",
                message
            );
            assert_eq!(output, "");
        }
        other => panic!("expected runtime error, got {:?}", other),
    }
    assert!(!marker.exists());
}

