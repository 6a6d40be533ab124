use crate::caller;
use crate::cli::{Cli, VariationSource};
use crate::utils::{derive_sample_name, get_bam_header, is_bam_mapped, Result};
use crate::varcell::{
    workflows::classify_variation, writers::write_sample_result, ResolvedEvidence, SampleResult,
    TargetRegistry, Variation,
};
use crossbeam_channel::{bounded, Sender};
use rayon::{
    iter::{ParallelBridge, ParallelIterator},
    ThreadPoolBuilder,
};
use rust_htslib::bam;
use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

thread_local! {
    static CTX_BAM_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
    // One reader per pool thread; handles are never shared across threads
    static THREAD_BAM_READER: RefCell<bam::IndexedReader> =
        RefCell::new(create_thread_local_bam_reader());
}

fn create_thread_local_bam_reader() -> bam::IndexedReader {
    let path = CTX_BAM_PATH.with(|ctx_cell| {
        ctx_cell
            .borrow()
            .as_ref()
            .expect("Thread context not initialized for BAM path")
            .clone()
    });
    bam::IndexedReader::from_path(&path).unwrap_or_else(|e| {
        panic!(
            "Failed to initialize BAM reader for path {}: {}",
            path.display(),
            e
        )
    })
}

const CHANNEL_BUFFER_SIZE: usize = 2048;

pub fn classify(args: Cli) -> Result<()> {
    let registry_path = match &args.variants {
        VariationSource::SkipFiltering => {
            log::info!("Variant filtering disabled, nothing to do for this batch");
            return Ok(());
        }
        VariationSource::Path(path) => path.clone(),
    };

    let registry = TargetRegistry::from_path(&registry_path)?;
    log::info!("Loaded {} targeted regions", registry.len());

    let bam_paths = read_alignment_list(&args.alignments_path)?;
    if bam_paths.is_empty() {
        return Err(format!(
            "No alignment files listed in {}",
            args.alignments_path.display()
        ));
    }

    create_dir(&args.vcf_dir)?;
    create_dir(&args.output_dir)?;

    let renames = match &args.sample_renames {
        Some(path) => load_sample_renames(path)?,
        None => HashMap::new(),
    };

    let timeout = args.caller_timeout.map(Duration::from_secs);

    // Each sample runs inside its own failure boundary; one failing sample
    // never aborts the batch
    let mut num_failed = 0;
    for bam_path in &bam_paths {
        if let Err(e) = process_sample(bam_path, &registry, &registry_path, &renames, timeout, &args)
        {
            log::error!("Sample {}: {}", bam_path.display(), e);
            num_failed += 1;
        }
    }

    log::info!(
        "Processed {} samples, {} failed",
        bam_paths.len(),
        num_failed
    );
    Ok(())
}

fn process_sample(
    bam_path: &Path,
    registry: &TargetRegistry,
    registry_path: &Path,
    renames: &HashMap<String, String>,
    timeout: Option<Duration>,
    args: &Cli,
) -> Result<()> {
    let bam_header = get_bam_header(bam_path)?;
    if !is_bam_mapped(&bam_header) {
        return Err("Input BAM is not mapped".into());
    }
    let sample_name = derive_sample_name(bam_path, &bam_header, renames)?;
    log::info!("{}: calling variants", sample_name);

    let vcf_path = args.vcf_dir.join(format!("{}.vcf", sample_name));
    caller::call_variants(
        &args.caller,
        &args.genome_path,
        args.min_coverage,
        bam_path,
        registry_path,
        &vcf_path,
        timeout,
    )?;
    let vcf_gz_path = caller::compress_and_index(&vcf_path, timeout)?;

    let variations = caller::confirmed_variations(&vcf_gz_path, registry)?;
    log::info!("{}: {} confirmed variations", sample_name, variations.len());

    let results = classify_sample(bam_path, variations, args.num_threads)?;

    let output_path = args.output_dir.join(format!("{}.json", sample_name));
    write_sample_result(&output_path, &results)?;
    log::info!("{}: wrote {}", sample_name, output_path.display());
    Ok(())
}

/// Fans classification of the sample's variations out over a dedicated pool.
/// Every pool thread owns its own indexed reader; resolved results flow over
/// a bounded channel into a single accumulator thread that performs the only
/// writes into the result map.
fn classify_sample(
    bam_path: &Path,
    variations: Vec<Variation>,
    num_threads: usize,
) -> Result<SampleResult> {
    if variations.is_empty() {
        return Ok(SampleResult::new());
    }

    let (sender_result, receiver_result) =
        bounded::<(String, ResolvedEvidence)>(CHANNEL_BUFFER_SIZE);
    let accumulator_thread = thread::spawn(move || {
        let mut results = SampleResult::new();
        for (key, evidence) in &receiver_result {
            results.insert(key, evidence);
        }
        results
    });

    let pool = initialize_thread_pool(num_threads, bam_path.to_path_buf())?;
    pool.install(|| {
        variations
            .into_iter()
            .par_bridge()
            .for_each_with(&sender_result, |s, variation| process_variation(variation, s));
    });

    drop(sender_result);
    let results = accumulator_thread
        .join()
        .expect("Accumulator thread panicked");
    Ok(results)
}

fn process_variation(variation: Variation, sender_result: &Sender<(String, ResolvedEvidence)>) {
    THREAD_BAM_READER.with(|reader_cell| {
        let mut reader = reader_cell.borrow_mut();
        match classify_variation(&variation, &mut reader) {
            Ok(evidence) => {
                if let Err(e) = sender_result.send((variation.key(), evidence.resolve())) {
                    log::error!("Failed to send result for {}: {}", variation.key(), e);
                }
            }
            Err(err) => {
                // A failing variation is dropped; its siblings continue
                log::error!("Error classifying variation {}: {}", variation.key(), err);
            }
        }
    });
}

fn initialize_thread_pool(num_threads: usize, bam_path: PathBuf) -> Result<rayon::ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("varcell-{}", i))
        .start_handler(move |_thread_index| {
            CTX_BAM_PATH.with(|cell| {
                *cell.borrow_mut() = Some(bam_path.clone());
            });
            log::trace!("Initialized thread {:?}", std::thread::current().id());
        })
        .exit_handler(|_thread_index| {
            CTX_BAM_PATH.with(|cell| {
                *cell.borrow_mut() = None;
            });
        })
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))
}

fn read_alignment_list(path: &Path) -> Result<Vec<PathBuf>> {
    let file = fs::File::open(path)
        .map_err(|e| format!("Failed to open alignment list {}: {}", path.display(), e))?;
    let reader = BufReader::new(file);

    let mut paths = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            format!(
                "Error at line {} of {}: {}",
                line_number + 1,
                path.display(),
                e
            )
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        paths.push(PathBuf::from(line));
    }
    Ok(paths)
}

fn load_sample_renames(path: &Path) -> Result<HashMap<String, String>> {
    let file = fs::File::open(path)
        .map_err(|e| format!("Failed to open rename file {}: {}", path.display(), e))?;
    load_renames_from_reader(BufReader::new(file))
        .map_err(|e| format!("Rename file {}: {}", path.display(), e))
}

fn load_renames_from_reader<R: BufRead>(reader: R) -> Result<HashMap<String, String>> {
    let mut renames = HashMap::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split('\t');
        let (Some(from), Some(to)) = (parts.next(), parts.next()) else {
            return Err(format!(
                "Expected two tab-separated names at line {}",
                line_number + 1
            ));
        };

        if renames.insert(from.to_string(), to.to_string()).is_some() {
            return Err(format!(
                "Duplicate sample name at line {}: {}",
                line_number + 1,
                from
            ));
        }
    }

    Ok(renames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn renames_from_reader() {
        let data = "GBZ_10195\tscAML_1_003_10197\nLAE_5904\tscAML_3_005_5904\n";
        let renames = load_renames_from_reader(std::io::Cursor::new(data)).unwrap();
        assert_eq!(
            renames.get("GBZ_10195"),
            Some(&"scAML_1_003_10197".to_string())
        );
        assert_eq!(renames.len(), 2);
    }

    #[test]
    fn renames_reject_single_column() {
        let data = "GBZ_10195\n";
        assert!(load_renames_from_reader(std::io::Cursor::new(data)).is_err());
    }

    #[test]
    fn renames_reject_duplicates() {
        let data = "a\tb\na\tc\n";
        assert!(load_renames_from_reader(std::io::Cursor::new(data)).is_err());
    }

    #[test]
    fn alignment_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let list_path = dir.path().join("bams.txt");
        let mut file = fs::File::create(&list_path).unwrap();
        writeln!(file, "/data/sample_a.bam").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  /data/sample_b.bam  ").unwrap();

        let paths = read_alignment_list(&list_path).unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/data/sample_a.bam"),
                PathBuf::from("/data/sample_b.bam")
            ]
        );
    }

    #[test]
    fn alignment_list_missing_file_is_err() {
        let err = read_alignment_list(Path::new("/no/such/list.txt")).unwrap_err();
        assert!(err.contains("Failed to open alignment list"));
    }
}
