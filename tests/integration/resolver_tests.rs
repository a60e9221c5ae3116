use linkwatch::symlink::windows_path::resolve_relative_target;
use linkwatch::{LinkError, SymlinkResolver};
use pretty_assertions::assert_eq;

#[test]
fn test_relative_windows_target_uses_link_directory() {
    assert_eq!(
        resolve_relative_target(r"C:\a\b\link", r"..\target.json"),
        r"C:\a\target.json"
    );
}

#[test]
fn test_regular_path_is_its_own_target() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let file = temp_dir.path().join("plain.json");
    std::fs::write(&file, "{}").unwrap();

    let resolver = SymlinkResolver::for_host();
    assert_eq!(resolver.resolve_final_target(&file).unwrap(), file);
    assert_eq!(resolver.try_link_target(&file).unwrap(), None);
    assert!(matches!(
        resolver.read_link(&file),
        Err(LinkError::NotALink { .. })
    ));
}

#[cfg(unix)]
mod unix {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::symlink;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use test_case::test_case;

    /// `link{len-1}` -> ... -> `link0` -> `target.json`
    fn chain(dir: &TempDir, len: usize) -> (PathBuf, PathBuf) {
        let target = dir.path().join("target.json");
        std::fs::write(&target, "{}").unwrap();
        let mut previous = target.clone();
        for i in 0..len {
            let link = dir.path().join(format!("link{i}"));
            symlink(&previous, &link).unwrap();
            previous = link;
        }
        (previous, target)
    }

    #[test_case(1 ; "single hop")]
    #[test_case(16 ; "medium chain")]
    #[test_case(32 ; "at the bound")]
    fn test_chains_within_bound_resolve(len: usize) {
        let dir = TempDir::new().unwrap();
        let (head, target) = chain(&dir, len);
        let resolver = SymlinkResolver::for_host();
        assert_eq!(resolver.resolve_final_target(&head).unwrap(), target);
        assert_eq!(resolver.try_link_target(&head).unwrap(), Some(target));
    }

    #[test]
    fn test_chain_past_bound_fails() {
        let dir = TempDir::new().unwrap();
        let (head, _) = chain(&dir, 33);
        match SymlinkResolver::for_host().resolve_final_target(&head) {
            Err(LinkError::LinkCycleExceeded { max_depth, .. }) => assert_eq!(max_depth, 32),
            other => panic!("expected LinkCycleExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_two_link_cycle_trips_the_bound() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        symlink(&b, &a).unwrap();
        symlink(&a, &b).unwrap();

        let resolver = SymlinkResolver::for_host();
        assert!(matches!(
            resolver.resolve_final_target(&a),
            Err(LinkError::LinkCycleExceeded { .. })
        ));
        assert!(resolver.final_modification_time(&a).is_err());
    }

    #[test]
    fn test_relative_link_resolves_against_link_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::create_dir(dir.path().join("config")).unwrap();
        let target = dir.path().join("data").join("settings.json");
        std::fs::write(&target, "{}").unwrap();
        let link = dir.path().join("config").join("settings.json");
        symlink("../data/settings.json", &link).unwrap();

        let resolver = SymlinkResolver::for_host();
        let resolved = resolver.resolve_final_target(&link).unwrap();
        assert_eq!(
            std::fs::canonicalize(resolved).unwrap(),
            std::fs::canonicalize(&target).unwrap()
        );
        assert_eq!(
            resolver.final_modification_time(&link).unwrap(),
            Some(std::fs::metadata(&target).unwrap().modified().unwrap())
        );
    }

    #[test]
    fn test_custom_depth_is_respected() {
        let dir = TempDir::new().unwrap();
        let (head, _) = chain(&dir, 5);
        let resolver = SymlinkResolver::for_host().with_max_depth(4);
        assert!(resolver.resolve_final_target(&head).is_err());
        assert!(resolver.with_max_depth(5).resolve_final_target(&head).is_ok());
    }
}
