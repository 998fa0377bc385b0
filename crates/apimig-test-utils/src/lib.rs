//! Testing utilities for the apimig workspace
//!
//! Shared source fixtures, file helpers, and synthetic inputs.

#![allow(missing_docs)]

use apimig_core::{InterceptorType, Preset};
use std::path::{Path, PathBuf};

/// Legacy API module using the default import
pub const LEGACY_SERVICE: &str = "\
import apiClient from '@/lib/api';

export interface Leave {
  id: string;
}

export async function listLeaves(): Promise<Leave[]> {
  const response = await apiClient.get('/api/v1/leaves');
  return response.data;
}

export async function createLeave(body: Partial<Leave>): Promise<Leave> {
  const response = await apiClient.post('/api/v1/leaves', body);
  return response.data;
}
";

/// Same module after migration with the default preset
pub const LEGACY_SERVICE_MIGRATED: &str = "\
import { createPresetApiClient } from '@/lib/api';

export interface Leave {
  id: string;
}

export async function listLeaves(): Promise<Leave[]> {
  const client = createPresetApiClient('default');
  const response = await client.get('/leaves');
  return response.data;
}

export async function createLeave(body: Partial<Leave>): Promise<Leave> {
  const client = createPresetApiClient('default');
  const response = await client.post('/leaves', body);
  return response.data;
}
";

/// Hook importing the accessor and the deprecated error module
pub const ACCESSOR_HOOK: &str = "\
import { useQuery } from '@tanstack/react-query';
import { getAuthClient } from '@/lib/api';
import { handleApiError } from '@/lib/api/error';

export function useProfile() {
  return useQuery({
    queryKey: ['profile'],
    queryFn: async () => {
      try {
        const { data } = await getAuthClient().get('/api/v1/profile');
        return data;
      } catch (error) {
        throw handleApiError(error);
      }
    },
  });
}
";

/// Component whose legacy client escapes through a non-call reference
pub const ESCAPING_COMPONENT: &str = "\
import { apiClient } from '@/lib/api';

export function Panel() {
  const load = async () => {
    const { data } = await apiClient.get('/api/v1/panels');
    return data;
  };
  return <Table loader={load} client={apiClient} />;
}
";

/// File already using the unified pattern
pub const MIGRATED_MODULE: &str = "\
import { createPresetApiClient } from '@/lib/api';

export async function getMe() {
  const client = createPresetApiClient('auth');
  return client.get('/auth/me');
}
";

/// File with no API usage at all
pub const UNRELATED_MODULE: &str = "\
export function clamp(value: number, min: number, max: number): number {
  return Math.min(Math.max(value, min), max);
}
";

/// Syntactically invalid source
pub const MALFORMED_MODULE: &str = "\
import apiClient from '@/lib/api';
export function broken( {
  return apiClient.get('/api/v1/x');
";

/// Write `content` to `root/relative`, creating parent directories
pub fn write_fixture(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Read a file written by a test
pub fn read_fixture(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// `n` distinct, UUID-shaped synthetic tokens
///
/// Deterministic so fairness tests are reproducible.
pub fn synthetic_tokens(n: usize) -> Vec<String> {
    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..n)
        .map(|_| {
            let mut next = || {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                state
            };
            let a = next();
            let b = next();
            format!(
                "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
                a >> 32,
                (a >> 16) & 0xffff,
                a & 0x0fff,
                0x8000 | ((b >> 48) & 0x3fff),
                b & 0xffff_ffff_ffff
            )
        })
        .collect()
}

/// Every interceptor category in reverse rank order
pub fn reversed_interceptors() -> Vec<InterceptorType> {
    InterceptorType::ALL.iter().rev().copied().collect()
}

/// Every preset
pub fn all_presets() -> Vec<Preset> {
    Preset::ALL.to_vec()
}
