//! Runtime SIMD feature detection shared by the native providers.

use crate::features::Features;

/// Features of the running CPU.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) fn detect() -> Features {
  use crate::features::x86;

  let mut features = Features::NONE;
  if std::arch::is_x86_feature_detected!("sse4.2") {
    features |= x86::SSE42;
  }
  if std::arch::is_x86_feature_detected!("avx2") {
    features |= x86::AVX2;
  }
  if std::arch::is_x86_feature_detected!("avx512f") {
    features |= x86::AVX512F;
  }
  if std::arch::is_x86_feature_detected!("avx512dq") {
    features |= x86::AVX512DQ;
  }
  if std::arch::is_x86_feature_detected!("avx512cd") {
    features |= x86::AVX512CD;
  }
  if std::arch::is_x86_feature_detected!("avx512bw") {
    features |= x86::AVX512BW;
  }
  if std::arch::is_x86_feature_detected!("avx512vl") {
    features |= x86::AVX512VL;
  }
  if std::arch::is_x86_feature_detected!("avx512vnni") {
    features |= x86::AVX512VNNI;
  }
  features
}

/// Features of the running CPU.
///
/// Dot-product support comes from `HWCAP_ASIMDDP`. Older kernels that predate
/// that bit but expose `HWCAP_CPUID` let userspace read `ID_AA64ISAR0_EL1`
/// directly; the kernel traps and emulates the access.
#[cfg(all(target_arch = "aarch64", any(target_os = "linux", target_os = "android")))]
pub(crate) fn detect() -> Features {
  use crate::features::arm;

  let hwcap = std::fs::read("/proc/self/auxv").map(|auxv| hwcap(&auxv)).unwrap_or(0);

  let dotprod = if hwcap & HWCAP_ASIMDDP != 0 {
    true
  } else if hwcap & HWCAP_CPUID != 0 {
    isar0_has_dotprod(read_isar0())
  } else {
    false
  };

  if dotprod { arm::NEON_DOTPROD } else { Features::NONE }
}

/// Features of the running CPU. Nothing is detected on this target.
#[cfg(not(any(
  target_arch = "x86",
  target_arch = "x86_64",
  all(target_arch = "aarch64", any(target_os = "linux", target_os = "android"))
)))]
pub(crate) fn detect() -> Features {
  Features::NONE
}

// ─────────────────────────────────────────────────────────────────────────────
// aarch64 helpers
// ─────────────────────────────────────────────────────────────────────────────

// HWCAP bit positions (from linux/arch/arm64/include/uapi/asm/hwcap.h)
#[cfg(any(all(target_arch = "aarch64", any(target_os = "linux", target_os = "android")), test))]
const HWCAP_CPUID: u64 = 1 << 11;
#[cfg(any(all(target_arch = "aarch64", any(target_os = "linux", target_os = "android")), test))]
const HWCAP_ASIMDDP: u64 = 1 << 20;

/// `AT_HWCAP` from a raw ELF auxiliary vector of `(u64 type, u64 value)` pairs.
#[cfg(any(all(target_arch = "aarch64", any(target_os = "linux", target_os = "android")), test))]
fn hwcap(auxv: &[u8]) -> u64 {
  const AT_NULL: u64 = 0;
  const AT_HWCAP: u64 = 16;

  for chunk in auxv.chunks_exact(16) {
    let (ty, value) = chunk.split_at(8);
    let (Ok(ty), Ok(value)) = (<[u8; 8]>::try_from(ty), <[u8; 8]>::try_from(value)) else {
      break;
    };
    match u64::from_ne_bytes(ty) {
      AT_HWCAP => return u64::from_ne_bytes(value),
      AT_NULL => break,
      _ => {}
    }
  }
  0
}

/// The DP field, bits 47:44 of `ID_AA64ISAR0_EL1`, is non-zero.
#[cfg(any(all(target_arch = "aarch64", any(target_os = "linux", target_os = "android")), test))]
const fn isar0_has_dotprod(isar0: u64) -> bool {
  (isar0 >> 44) & 0xf != 0
}

#[cfg(all(target_arch = "aarch64", any(target_os = "linux", target_os = "android")))]
fn read_isar0() -> u64 {
  let isar0: u64;
  // SAFETY: only reached when the kernel advertises HWCAP_CPUID, which means
  // EL0 reads of ID registers are trapped and emulated instead of faulting.
  // The instruction has no memory effects.
  unsafe {
    core::arch::asm!("mrs {}, ID_AA64ISAR0_EL1", out(reg) isar0, options(nomem, nostack, preserves_flags));
  }
  isar0
}
