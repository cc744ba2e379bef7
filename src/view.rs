//   Copyright 2018 Egor Larionov
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

//! Zero-copy views over engine owned buffers.
//!
//! Ipopt hands every callback raw pointers together with the length it expects to be read or
//! written. The functions here turn such a pair into a slice borrowing the engine storage, so
//! writes land directly in the engine's arrays. The returned lifetime is unbounded; callers must
//! bind it to the callback invocation and never store the slice.
//!
//! A null pointer or a non-positive length produces an empty slice. Ipopt passes null for arrays
//! of a zero sized quantity (e.g. constraint arrays of an unconstrained problem) and for the
//! values array during a structure request.

use std::slice;

use ffi::Index;

/// Read-only view of `len` elements starting at `ptr`.
///
/// # Safety
///
/// If `ptr` is non-null it must point to at least `len` initialized elements that stay valid
/// and unaliased by writers for the chosen lifetime.
#[inline]
pub unsafe fn view<'a, T>(ptr: *const T, len: Index) -> &'a [T] {
    if ptr.is_null() || len <= 0 {
        &[]
    } else {
        slice::from_raw_parts(ptr, len as usize)
    }
}

/// Read-write view of `len` elements starting at `ptr`.
///
/// # Safety
///
/// If `ptr` is non-null it must point to at least `len` initialized elements that are not
/// otherwise accessed for the chosen lifetime.
#[inline]
pub unsafe fn view_mut<'a, T>(ptr: *mut T, len: Index) -> &'a mut [T] {
    if ptr.is_null() || len <= 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(ptr, len as usize)
    }
}

/// Like `view_mut` but distinguishes an absent buffer (`None`) from an empty one.
///
/// # Safety
///
/// Same requirements as `view_mut`.
#[inline]
pub unsafe fn view_mut_opt<'a, T>(ptr: *mut T, len: Index) -> Option<&'a mut [T]> {
    if ptr.is_null() {
        None
    } else {
        Some(view_mut(ptr, len))
    }
}
