use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use packfs::{pack, Entry, Filesystem, LoadMode, VirtualFile, Whence};

fn synthetic_entries(dirs: usize, files_per_dir: usize, file_size: usize) -> Vec<Entry> {
    let mut entries = vec![Entry::directory("site", 1_700_000_000)];
    for d in 0..dirs {
        let dir = format!("site/d{d:03}");
        entries.push(Entry::directory(dir.clone(), 1_700_000_000));
        for f in 0..files_per_dir {
            let content: Vec<u8> = (0..file_size).map(|i| (i % 61) as u8 + b'A').collect();
            entries.push(Entry::file(format!("{dir}/f{f:03}.txt"), 1_700_000_000, content));
        }
    }
    entries
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for (dirs, files) in [(4, 16), (16, 64)] {
        let bundle = pack(synthetic_entries(dirs, files, 2048), 6).unwrap();
        group.throughput(Throughput::Bytes(bundle.len() as u64));
        for mode in [LoadMode::Eager, LoadMode::Lazy] {
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), dirs * files),
                &bundle,
                |b, bundle| b.iter(|| Filesystem::load(mode, black_box(bundle)).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_open_read(c: &mut Criterion) {
    let bundle = pack(synthetic_entries(16, 64, 2048), 6).unwrap();
    let fs = Filesystem::new(LoadMode::Eager, &bundle);

    c.bench_function("open_read_file", |b| {
        let mut buf = vec![0u8; 4096];
        b.iter(|| {
            let mut file = fs.open(black_box("site/d007/f031.txt")).unwrap();
            file.seek(512, Whence::Start).unwrap();
            file.read(&mut buf).unwrap()
        });
    });

    c.bench_function("readdir_all", |b| {
        b.iter(|| {
            let mut dir = fs.open(black_box("site/d007")).unwrap();
            dir.readdir(-1).unwrap().len()
        });
    });
}

fn bench_pack(c: &mut Criterion) {
    let entries = synthetic_entries(4, 16, 2048);
    let mut group = c.benchmark_group("pack");
    for level in [0, 6, 9] {
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, &level| {
            b.iter(|| pack(black_box(entries.clone()), level).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_load, bench_open_read, bench_pack);
criterion_main!(benches);
