//! sysfs CPU topology reader.
//!
//! Layout read, relative to the root (normally `/sys/devices/system/cpu`):
//!
//! ```text
//! online                                  "0-7" or "0,2-5"
//! cpuN/topology/core_id                   per-package core number
//! cpuN/topology/physical_package_id       socket number (may be -1)
//! cpuN/cache/indexK/{level,type,size,shared_cpu_list}
//! ```

use std::{
  fmt, fs, io,
  path::{Path, PathBuf},
};

use crate::provider::{Cache, Processor};

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Why the sysfs topology could not be used.
#[derive(Debug)]
#[non_exhaustive]
pub enum TopologyError {
  /// A required file could not be read.
  Io { path: PathBuf, source: io::Error },
  /// A file held something other than the expected format.
  Parse { path: PathBuf, value: String },
  /// The online CPU list was empty.
  NoProcessors,
}

impl fmt::Display for TopologyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
      Self::Parse { path, value } => write!(f, "unexpected contents {value:?} in {}", path.display()),
      Self::NoProcessors => f.write_str("no online processors"),
    }
  }
}

impl core::error::Error for TopologyError {
  fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
    match self {
      Self::Io { source, .. } => Some(source),
      _ => None,
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Topology
// ─────────────────────────────────────────────────────────────────────────────

/// Read every online CPU's core and data-cache descriptors.
///
/// Processor indices are positions in the sorted online list, so cache
/// ranges stay meaningful when CPUs are offline. CPUs without readable data
/// caches are returned as-is; whether the topology is usable is up to the
/// caller.
pub(super) fn read_topology(root: &Path) -> Result<Vec<Processor>, TopologyError> {
  let online_path = root.join("online");
  let online = read_required(&online_path)?;
  let cpus = parse_cpu_list(&online).ok_or_else(|| parse_error(&online_path, &online))?;
  if cpus.is_empty() {
    return Err(TopologyError::NoProcessors);
  }

  let mut core_keys: Vec<(i64, i64)> = Vec::new();
  let mut processors = Vec::with_capacity(cpus.len());
  for (position, &cpu) in cpus.iter().enumerate() {
    let cpu_dir = root.join(format!("cpu{cpu}"));
    let key = core_key(&cpu_dir, cpu)?;
    let core = match core_keys.iter().position(|k| *k == key) {
      Some(core) => core,
      None => {
        core_keys.push(key);
        core_keys.len() - 1
      }
    };

    let mut processor = Processor::new(core);
    read_caches(&cpu_dir, &cpus, position, &mut processor)?;
    processors.push(processor);
  }
  Ok(processors)
}

/// `(package, core_id)`; missing topology files make each CPU its own core.
fn core_key(cpu_dir: &Path, cpu: usize) -> Result<(i64, i64), TopologyError> {
  let topology = cpu_dir.join("topology");
  let package = read_optional_int(&topology.join("physical_package_id"))?.unwrap_or(0);
  let core = read_optional_int(&topology.join("core_id"))?.unwrap_or(cpu as i64);
  Ok((package, core))
}

fn read_caches(cpu_dir: &Path, cpus: &[usize], position: usize, processor: &mut Processor) -> Result<(), TopologyError> {
  let cache_dir = cpu_dir.join("cache");
  for index in 0.. {
    let dir = cache_dir.join(format!("index{index}"));
    if !dir.is_dir() {
      break;
    }

    let Some(kind) = read_optional(&dir.join("type"))? else {
      continue;
    };
    if kind.trim() == "Instruction" {
      continue;
    }
    let (Some(level), Some(size)) = (read_optional(&dir.join("level"))?, read_optional(&dir.join("size"))?) else {
      continue;
    };
    let level: u8 = level.trim().parse().map_err(|_| parse_error(&dir.join("level"), &level))?;
    let size = parse_size(&size).ok_or_else(|| parse_error(&dir.join("size"), &size))?;
    if size == 0 {
      continue;
    }

    let (start, end) = match read_optional(&dir.join("shared_cpu_list"))? {
      Some(list) => {
        let shared = parse_cpu_list(&list).ok_or_else(|| parse_error(&dir.join("shared_cpu_list"), &list))?;
        shared_range(&shared, cpus).unwrap_or((position, position))
      }
      None => (position, position),
    };
    let cache = Cache::new(size, start, end - start + 1);

    let slot = match level {
      1 => &mut processor.l1d,
      2 => &mut processor.l2,
      3 => &mut processor.l3,
      4 => &mut processor.l4,
      _ => continue,
    };
    if slot.is_none() {
      *slot = Some(cache);
    }
  }
  Ok(())
}

/// Positions of the first and last online CPUs in `shared`.
fn shared_range(shared: &[usize], cpus: &[usize]) -> Option<(usize, usize)> {
  let mut positions = shared.iter().filter_map(|cpu| cpus.binary_search(cpu).ok());
  let first = positions.next()?;
  let last = positions.next_back().unwrap_or(first);
  Some((first.min(last), first.max(last)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a kernel CPU list such as `0-3,8,10-11` into sorted, unique ids.
fn parse_cpu_list(list: &str) -> Option<Vec<usize>> {
  let list = list.trim();
  let mut cpus = Vec::new();
  if list.is_empty() {
    return Some(cpus);
  }
  for part in list.split(',') {
    let part = part.trim();
    match part.split_once('-') {
      Some((lo, hi)) => {
        let lo: usize = lo.parse().ok()?;
        let hi: usize = hi.parse().ok()?;
        if hi < lo {
          return None;
        }
        cpus.extend(lo..=hi);
      }
      None => cpus.push(part.parse().ok()?),
    }
  }
  cpus.sort_unstable();
  cpus.dedup();
  Some(cpus)
}

/// Parse a sysfs cache size: `48K`, `2048K`, `32M`, or plain bytes.
fn parse_size(size: &str) -> Option<usize> {
  let size = size.trim();
  let (digits, unit) = if let Some(digits) = size.strip_suffix(['K', 'k']) {
    (digits, 1024)
  } else if let Some(digits) = size.strip_suffix(['M', 'm']) {
    (digits, 1024 * 1024)
  } else if let Some(digits) = size.strip_suffix(['G', 'g']) {
    (digits, 1024 * 1024 * 1024)
  } else {
    (size, 1)
  };
  digits.trim().parse::<usize>().ok()?.checked_mul(unit)
}

// ─────────────────────────────────────────────────────────────────────────────
// File Access
// ─────────────────────────────────────────────────────────────────────────────

fn read_required(path: &Path) -> Result<String, TopologyError> {
  fs::read_to_string(path).map_err(|source| TopologyError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn read_optional(path: &Path) -> Result<Option<String>, TopologyError> {
  match fs::read_to_string(path) {
    Ok(contents) => Ok(Some(contents)),
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(source) => Err(TopologyError::Io {
      path: path.to_path_buf(),
      source,
    }),
  }
}

fn read_optional_int(path: &Path) -> Result<Option<i64>, TopologyError> {
  match read_optional(path)? {
    Some(value) => value.trim().parse().map(Some).map_err(|_| parse_error(path, &value)),
    None => Ok(None),
  }
}

fn parse_error(path: &Path, value: &str) -> TopologyError {
  TopologyError::Parse {
    path: path.to_path_buf(),
    value: value.trim().to_owned(),
  }
}
