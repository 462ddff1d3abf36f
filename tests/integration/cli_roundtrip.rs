use super::support::{assets_tree, pack_tree};
use clap::Parser;
use packfs::config::PackfsConfig;
use packfs::tooling::cli::{Cli, CliContext};
use packfs::{Filesystem, LoadMode, VirtualFile};

#[test]
fn cli_pack_matches_generator() {
    let dir = assets_tree();
    let output = dir.path().join("assets.pkfs");
    let cli = Cli::try_parse_from([
        "packfs",
        "pack",
        "assets",
        "--output",
        output.to_str().unwrap(),
        "--base",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();

    let context = CliContext::with_config(PackfsConfig::default());
    let message = context.execute(&cli.command).unwrap();
    assert!(message.contains("Packed 11 entries"), "{message}");

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written, pack_tree(dir.path()));

    let fs = Filesystem::new(LoadMode::Lazy, &written);
    let mut two = fs.open("assets/readdir/2.txt").unwrap();
    let mut buf = [0u8; 16];
    let n = two.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"two");
}

#[test]
fn cli_cat_and_ls() {
    let dir = assets_tree();
    let output = dir.path().join("assets.pkfs");
    std::fs::write(&output, pack_tree(dir.path())).unwrap();
    let context = CliContext::with_config(PackfsConfig::default());
    let bundle = output.to_str().unwrap();

    let cat = Cli::try_parse_from(["packfs", "cat", bundle, "assets/css/site.css"]).unwrap();
    assert_eq!(context.execute(&cat.command).unwrap(), "body { margin: 0 }\n");

    let ls = Cli::try_parse_from(["packfs", "ls", bundle, "--root", "assets/readdir"]).unwrap();
    let table = context.execute(&ls.command).unwrap();
    for name in ["assets/readdir", "1.txt", "2.txt", "3.txt", "dr-xr-xr-x", "-r--r--r--"] {
        assert!(table.contains(name), "missing {name} in\n{table}");
    }
    assert!(!table.contains("site.css"));
}
