use sff2frg::store::ReadStore;
use sff2frg::{config::Config, error::SffError, library::LibraryRecord};
use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<_> = std::env::args_os().collect();
    let config = match Config::parse_args(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("sff2frg: {e}");
            return ExitCode::FAILURE;
        }
    };

    sff2frg::logging::init(config.log.as_deref());

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sff2frg: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> sff2frg::Result<()> {
    let library = LibraryRecord::new(
        config.library_name.clone(),
        config.insert_size,
        config.linker.clone(),
    );

    let mut tmp_store = sff2frg::tempstore::TempStoreGuard::new(&config.output)
        .map_err(|e| SffError::IoUnwritable {
            path: tmp_store_path_hint(&config.output),
            source: e,
        })?;

    let mut store = ReadStore::new();
    let mut reads_seen = 0u64;

    for input in &config.inputs {
        let stream = sff2frg::decompress::open_any(input)?;
        let mut reader = sff2frg::sff::SffReader::new(stream, input)?;
        let key_length = reader.header().key_length;
        while let Some(read) = reader.next_read()? {
            reads_seen += 1;
            sff2frg::ingest::ingest_read(&mut store, &read, key_length);
        }
    }

    sff2frg::filters::low_quality::run(&mut store);
    sff2frg::filters::prefix_dedup::run(&mut store);
    if let Some(linker) = &library.linker {
        sff2frg::filters::linker::run(&mut store, linker);
    }

    let out_file = File::create(&config.output).map_err(|e| SffError::IoUnwritable {
        path: config.output.clone(),
        source: e,
    })?;
    let mut writer = BufWriter::new(out_file);
    sff2frg::emit::run(&store, &library, &mut writer).map_err(|e| SffError::IoUnwritable {
        path: config.output.clone(),
        source: e,
    })?;

    tmp_store.finish_successfully();

    let live = store.stream_live(sff2frg::store::Projection::default()).count();
    log::info!(
        "sff2frg: {reads_seen} reads read, {live} fragments emitted to {}",
        config.output.display()
    );

    Ok(())
}

fn tmp_store_path_hint(output: &std::path::Path) -> std::path::PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".tmpStore");
    std::path::PathBuf::from(name)
}
