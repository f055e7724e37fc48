use treefs::archive::rle;
use treefs::fsystem::Access;
use treefs::{run, FileSystem, FsErrorType};

fn session(user: &str) -> FileSystem {
    FileSystem::new(user)
}

#[test]
fn resolved_paths_print_in_normal_form() {
    let mut fs = session("user");
    fs.mkdir("/a").unwrap();
    fs.mkdir("/a/b").unwrap();
    fs.touch("/a/b/f").unwrap();
    let cases = [
        ("/", "/"),
        ("//a", "/a"),
        ("/a/./b/", "/a/b"),
        ("/a//b/f", "/a/b/f"),
        ("/a/b/../b/./f", "/a/b/f"),
        ("/../a", "/a"),
    ];
    for (input, normal) in cases {
        let id = fs.resolve(input).unwrap();
        assert_eq!(fs.path_of(id), normal, "{}", input);
    }
    assert_eq!(
        fs.resolve("/a/b/f/g").unwrap_err().error_type,
        FsErrorType::NotADirectory
    );
    assert_eq!(
        fs.resolve("/a/missing/f").unwrap_err().message,
        "'missing'"
    );
}

#[test]
fn cd_dot_dot_climbs_and_stops_at_root() {
    let mut fs = session("user");
    fs.mkdir("/a").unwrap();
    fs.mkdir("/a/b").unwrap();
    fs.cd(Some("/a/b")).unwrap();
    assert_eq!(fs.pwd(), "/a/b");
    fs.cd(Some("..")).unwrap();
    assert_eq!(fs.pwd(), "/a");
    fs.cd(Some("/a/b")).unwrap();
    fs.cd(Some("..")).unwrap();
    fs.cd(Some("..")).unwrap();
    assert_eq!(fs.pwd(), "/");
    fs.cd(Some("..")).unwrap();
    assert_eq!(fs.pwd(), "/");
}

#[test]
fn recursive_rm_of_a_directory_with_one_file() {
    let mut fs = session("user");
    fs.mkdir("/d").unwrap();
    fs.write("/d/f", "content", false).unwrap();
    let err = fs.rm("/d", false).unwrap_err();
    assert_eq!(err.error_type, FsErrorType::NotEmpty);
    assert!(fs.resolve("/d/f").is_ok());

    assert_eq!(fs.rm("/d", true).unwrap(), 2);
    assert!(fs.resolve("/d").is_err());
    assert!(fs.resolve("/d/f").is_err());
    assert_eq!(fs.nodes().node_count(), 1);
}

#[test]
fn moved_nodes_only_appear_under_the_new_parent() {
    let mut fs = session("user");
    fs.mkdir("/old").unwrap();
    fs.mkdir("/new").unwrap();
    fs.mkdir("/old/item").unwrap();
    fs.touch("/old/item/inner").unwrap();
    fs.cd(Some("/old/item")).unwrap();

    fs.mv("/old/item", "/new").unwrap();
    assert_eq!(fs.pwd(), "/new/item");
    assert_eq!(fs.find(Some("/"), "item").unwrap(), "/new/item");
    assert_eq!(fs.find(Some("/"), "inner").unwrap(), "/new/item/inner");
    assert_eq!(fs.find(Some("/old"), "item").unwrap(), "");
}

#[test]
fn move_collision_leaves_both_sides_alone() {
    let mut fs = session("user");
    fs.mkdir("/a").unwrap();
    fs.mkdir("/b").unwrap();
    fs.write("/a/x", "from a", false).unwrap();
    fs.write("/b/x", "from b", false).unwrap();
    let err = fs.mv("/a/x", "/b").unwrap_err();
    assert_eq!(err.error_type, FsErrorType::NameCollision);
    assert_eq!(fs.cat("/a/x").unwrap(), "from a");
    assert_eq!(fs.cat("/b/x").unwrap(), "from b");
    assert_eq!(fs.ls(Some("/b"), false, false).unwrap(), "x");
}

#[test]
fn owner_other_and_root_access() {
    let mut fs = session("root");
    fs.mkdir("/home").unwrap();
    fs.chmod("777", "/home").unwrap();
    fs.su("alice").unwrap();
    fs.write("/home/notes", "alice's notes", false).unwrap();
    let id = fs.resolve("/home/notes").unwrap();
    assert_eq!(fs.node(id).unwrap().permissions(), "-rw-r--r--");

    // rw-r--r--: the owner may write, anyone else may only read
    assert!(fs.can(id, Access::Write));
    fs.su("bob").unwrap();
    assert!(fs.can(id, Access::Read));
    assert_eq!(
        fs.write("/home/notes", "bob was here", false)
            .unwrap_err()
            .error_type,
        FsErrorType::PermissionDenied
    );

    // rw-------: others lose read as well
    fs.su("alice").unwrap();
    fs.chmod("600", "/home/notes").unwrap();
    fs.su("bob").unwrap();
    assert!(!fs.can(id, Access::Read));
    assert!(!fs.can(id, Access::Write));
    assert_eq!(
        fs.cat("/home/notes").unwrap_err().error_type,
        FsErrorType::PermissionDenied
    );

    fs.su("root").unwrap();
    assert_eq!(fs.cat("/home/notes").unwrap(), "alice's notes");
    fs.write("/home/notes", "root was here", true).unwrap();
}

#[test]
fn mkdir_never_creates_missing_parents() {
    let mut fs = session("user");
    let err = fs.mkdir("/home/user").unwrap_err();
    assert_eq!(err.error_type, FsErrorType::PathNotFound);
    assert_eq!(err.message, "'home'");
    assert_eq!(fs.nodes().node_count(), 1);

    fs.mkdir("/home").unwrap();
    fs.mkdir("/home/user").unwrap();
    assert_eq!(fs.path_of(fs.resolve("home/user").unwrap()), "/home/user");
}

#[test]
fn archive_round_trip_is_isomorphic() {
    let mut fs = session("root");
    fs.mkdir("/site").unwrap();
    fs.mkdir("/site/assets").unwrap();
    fs.mkdir("/site/assets/img").unwrap();
    fs.write("/site/index.html", "<h1>hello</h1>\n", false).unwrap();
    fs.write("/site/assets/style.css", &"body {}\n".repeat(50), false)
        .unwrap();
    fs.touch("/site/.hidden").unwrap();
    fs.chmod("750", "/site/assets").unwrap();
    fs.chmod("600", "/site/index.html").unwrap();
    fs.chown("www", "/site/assets/style.css").unwrap();

    let listing = fs.tree(Some("/site"), true).unwrap();
    let (before, _) = fs.archive_text("/site").unwrap();

    fs.zip("/site", "/site.arc").unwrap();
    fs.rm("/site", true).unwrap();
    fs.unzip("/site.arc", None).unwrap();

    assert_eq!(fs.tree(Some("/site"), true).unwrap(), listing);
    let (after, _) = fs.archive_text("/site").unwrap();
    assert_eq!(after, before);
    assert_eq!(fs.cat("/site/assets/style.css").unwrap(), "body {}\n".repeat(50));
    let css = fs.resolve("/site/assets/style.css").unwrap();
    assert_eq!(fs.node(css).unwrap().owner(), "www");
}

#[test]
fn corrupt_archive_is_rejected_whole() {
    let mut fs = session("user");
    fs.write("/broken.arc", "DIR|x|drwxr-xr-x|user", false).unwrap();
    let err = fs.unzip("/broken.arc", None).unwrap_err();
    assert_eq!(err.error_type, FsErrorType::ArchiveCorrupt);
    assert!(fs.resolve("/x").is_err());
}

#[test]
fn rle_handles_long_runs_and_empty_input() {
    assert!(rle::decode(&rle::encode(b"")).is_empty());
    let mut data = vec![b'a'; 1000];
    data.extend_from_slice(b"bcd");
    data.extend(vec![0u8; 256]);
    assert_eq!(rle::decode(&rle::encode(&data)), data);
}

#[test]
fn unreadable_subtrees_do_not_stop_traversals() {
    let mut fs = session("root");
    fs.mkdir("/pub").unwrap();
    fs.mkdir("/pub/a").unwrap();
    fs.mkdir("/pub/b").unwrap();
    fs.touch("/pub/a/target").unwrap();
    fs.touch("/pub/b/target").unwrap();
    fs.chmod("700", "/pub/a").unwrap();
    fs.su("guest").unwrap();

    assert_eq!(
        fs.find(Some("/pub"), "target").unwrap(),
        "find: '/pub/a': Permission denied\n/pub/b/target"
    );
    let du = fs.du(Some("/pub")).unwrap();
    assert!(du.starts_with("du: cannot read directory '/pub/a': Permission denied"));
    assert!(du.ends_with("12288\t/pub"));
    let tree = fs.tree(Some("/pub"), false).unwrap();
    assert!(tree.contains("├── a [permission denied]"));
    assert!(tree.contains("    └── target"));
}

#[test]
fn command_session() {
    let mut fs = session("user");
    for line in [
        "mkdir projects",
        "cd projects",
        "touch readme",
        "echo first line > readme",
        "echo second line >> readme",
        "mkdir archive",
        "cp readme archive",
        "chmod 640 readme",
    ] {
        let out = run(&mut fs, line);
        assert_eq!(out.text, "", "{}", line);
    }
    assert_eq!(run(&mut fs, "pwd").text, "/projects");
    assert_eq!(run(&mut fs, "ls").text, "archive  readme");
    assert_eq!(run(&mut fs, "cat archive/readme").text, "first line\nsecond line");
    assert_eq!(run(&mut fs, "grep second readme").text, "second line");
    assert_eq!(run(&mut fs, "wc readme").text, "2 4 22 readme");
    assert_eq!(run(&mut fs, "head -n 1 readme").text, "first line");
    assert_eq!(run(&mut fs, "tail -n 1 readme").text, "second line");
    assert_eq!(
        run(&mut fs, "find readme").text,
        "/projects/archive/readme\n/projects/readme"
    );
    assert!(run(&mut fs, "stat readme").text.contains("Access: (640/-rw-r-----)"));
    assert_eq!(
        run(&mut fs, "rm archive").text,
        "rm: '/projects/archive': Directory not empty"
    );
    assert_eq!(
        run(&mut fs, "rm /").text,
        "rm: '/': Refusing to remove the current directory or one of its ancestors"
    );
    assert_eq!(run(&mut fs, "rm -r archive").text, "");
    assert_eq!(run(&mut fs, "ls").text, "readme");
    assert_eq!(
        run(&mut fs, "cd readme").text,
        "cd: 'readme': Not a directory"
    );
    assert!(run(&mut fs, "help").text.contains("unzip <archive> [dest]"));
    assert!(run(&mut fs, "exit").exit);
}

#[test]
fn rle_file_helpers_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("input.txt");
    let packed = dir.path().join("input.rle");
    let unpacked = dir.path().join("output.txt");
    std::fs::write(&source, "aaaaaaaaaabbbbbbbbbbcccccccccc\n".repeat(30)).unwrap();
    rle::compress_file(&source, &packed).unwrap();
    rle::decompress_file(&packed, &unpacked).unwrap();
    assert_eq!(
        std::fs::read(&source).unwrap(),
        std::fs::read(&unpacked).unwrap()
    );
}
