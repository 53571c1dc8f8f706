//! Windows SSPI negotiation engine
//!
//! Thin adapter from [`NegotiationEngine`] to the Win32 security support
//! provider interface. All buffers are owned by the caller; the provider is
//! never asked to allocate output tokens.

use crate::auth::engine::{ContextRequirements, NegotiationEngine, StepOutcome};
use crate::auth::handle::{ContextHandle, CredentialHandle, RawHandle};
use crate::auth::identity::AuthIdentity;
use crate::error::SecurityStatus;
use std::ffi::c_void;
use std::ptr;
use tracing::{trace, warn};
use windows::core::PCWSTR;
use windows::Win32::Security::Authentication::Identity::{
    AcquireCredentialsHandleW, CompleteAuthToken, DeleteSecurityContext, FreeContextBuffer,
    FreeCredentialsHandle, InitializeSecurityContextW, QuerySecurityPackageInfoW, ISC_REQ_FLAGS,
    SECBUFFER_TOKEN, SECPKG_CRED_OUTBOUND, SECURITY_NATIVE_DREP, SecBuffer, SecBufferDesc,
};
use windows::Win32::Security::Credentials::SecHandle;
use windows::Win32::System::Rpc::{SEC_WINNT_AUTH_IDENTITY_UNICODE, SEC_WINNT_AUTH_IDENTITY_W};
use zeroize::Zeroizing;

/// Null-terminated UTF-16 copy of `s`
fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn to_sec_handle(raw: RawHandle) -> SecHandle {
    SecHandle {
        dwLower: raw.lower,
        dwUpper: raw.upper,
    }
}

fn from_sec_handle(handle: &SecHandle) -> RawHandle {
    RawHandle::new(handle.dwLower, handle.dwUpper)
}

fn status_of(error: &windows::core::Error) -> SecurityStatus {
    SecurityStatus::from_i32(error.code().0)
}

/// Engine backed by the system SSPI provider
#[derive(Debug, Default)]
pub struct SspiEngine {
    _private: (),
}

impl SspiEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NegotiationEngine for SspiEngine {
    fn acquire_credential(
        &mut self,
        identity: &AuthIdentity,
        package: &str,
    ) -> Result<CredentialHandle, SecurityStatus> {
        let package = wide(package);
        let mut domain = Zeroizing::new(identity.domain().encode_utf16().collect::<Vec<u16>>());
        let mut user = Zeroizing::new(identity.user().encode_utf16().collect::<Vec<u16>>());
        let mut password =
            Zeroizing::new(identity.password().encode_utf16().collect::<Vec<u16>>());

        let auth_identity = SEC_WINNT_AUTH_IDENTITY_W {
            User: user.as_mut_ptr(),
            UserLength: user.len() as u32,
            Domain: domain.as_mut_ptr(),
            DomainLength: domain.len() as u32,
            Password: password.as_mut_ptr(),
            PasswordLength: password.len() as u32,
            Flags: SEC_WINNT_AUTH_IDENTITY_UNICODE,
        };

        let mut handle = SecHandle::default();
        let mut expiry = 0i64;
        // SAFETY: every pointer references a local that outlives the call, and
        // the provider copies the identity before returning.
        unsafe {
            AcquireCredentialsHandleW(
                PCWSTR::null(),
                PCWSTR(package.as_ptr()),
                SECPKG_CRED_OUTBOUND,
                None,
                Some(ptr::addr_of!(auth_identity).cast::<c_void>()),
                None,
                None,
                ptr::addr_of_mut!(handle),
                Some(ptr::addr_of_mut!(expiry)),
            )
        }
        .map_err(|e| status_of(&e))?;

        trace!(expiry, "SSPI credential acquired");
        Ok(CredentialHandle::from_raw(from_sec_handle(&handle)))
    }

    fn query_max_token_size(&mut self, package: &str) -> Result<u32, SecurityStatus> {
        let package = wide(package);
        // SAFETY: the package name is null-terminated and lives across the call;
        // the returned block is released with FreeContextBuffer below.
        unsafe {
            let info = QuerySecurityPackageInfoW(PCWSTR(package.as_ptr())).map_err(|e| status_of(&e))?;
            if info.is_null() {
                return Err(SecurityStatus::SECPKG_NOT_FOUND);
            }
            let max_token = (*info).cbMaxToken;
            if let Err(e) = FreeContextBuffer(info.cast::<c_void>()) {
                warn!(status = %status_of(&e), "Failed to free security package info");
            }
            Ok(max_token)
        }
    }

    fn step(
        &mut self,
        credential: &CredentialHandle,
        context: &mut Option<ContextHandle>,
        input: Option<&[u8]>,
        output: &mut [u8],
        target: &str,
        requirements: ContextRequirements,
    ) -> StepOutcome {
        let target = wide(target);
        let credential = to_sec_handle(credential.raw());

        let mut input_buffer = SecBuffer {
            cbBuffer: input.map_or(0, |i| i.len() as u32),
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: input.map_or(ptr::null_mut(), |i| i.as_ptr() as *mut c_void),
        };
        let input_desc = SecBufferDesc {
            ulVersion: 0,
            cBuffers: 1,
            pBuffers: ptr::addr_of_mut!(input_buffer),
        };

        let mut output_buffer = SecBuffer {
            cbBuffer: output.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: output.as_mut_ptr().cast::<c_void>(),
        };
        let mut output_desc = SecBufferDesc {
            ulVersion: 0,
            cBuffers: 1,
            pBuffers: ptr::addr_of_mut!(output_buffer),
        };

        let existing = context.as_ref().map(|c| to_sec_handle(c.raw()));
        let mut new_context = existing.unwrap_or_default();
        let mut attributes = 0u32;
        let mut expiry = 0i64;

        // SAFETY: buffers and handles are locals or caller-owned slices that
        // outlive the call; the provider writes at most cbBuffer bytes.
        let result = unsafe {
            InitializeSecurityContextW(
                Some(ptr::addr_of!(credential)),
                existing.as_ref().map(|h| h as *const SecHandle),
                Some(target.as_ptr()),
                ISC_REQ_FLAGS(requirements.bits()),
                0,
                SECURITY_NATIVE_DREP,
                input.map(|_| ptr::addr_of!(input_desc)),
                0,
                Some(ptr::addr_of_mut!(new_context)),
                Some(ptr::addr_of_mut!(output_desc)),
                ptr::addr_of_mut!(attributes),
                Some(ptr::addr_of_mut!(expiry)),
            )
        };
        let status = SecurityStatus::from_i32(result.0);

        let raw = from_sec_handle(&new_context);
        match context.as_mut() {
            Some(handle) => handle.set_raw(raw),
            None if !raw.is_null() => *context = Some(ContextHandle::from_raw(raw)),
            None => {}
        }

        trace!(%status, attributes, "InitializeSecurityContextW returned");
        StepOutcome::new(status, output_buffer.cbBuffer as usize)
    }

    fn complete_token(
        &mut self,
        context: &ContextHandle,
        output: &mut [u8],
    ) -> Result<(), SecurityStatus> {
        let context = to_sec_handle(context.raw());
        let mut buffer = SecBuffer {
            cbBuffer: output.len() as u32,
            BufferType: SECBUFFER_TOKEN,
            pvBuffer: output.as_mut_ptr().cast::<c_void>(),
        };
        let desc = SecBufferDesc {
            ulVersion: 0,
            cBuffers: 1,
            pBuffers: ptr::addr_of_mut!(buffer),
        };
        // SAFETY: the context handle came from InitializeSecurityContextW and
        // the buffer describes the caller's output slice.
        unsafe { CompleteAuthToken(ptr::addr_of!(context), ptr::addr_of!(desc)) }
            .map_err(|e| status_of(&e))
    }

    fn release_credential(&mut self, credential: CredentialHandle) -> Result<(), SecurityStatus> {
        let raw = credential.into_raw();
        if raw.is_null() {
            return Ok(());
        }
        let handle = to_sec_handle(raw);
        // SAFETY: the handle was produced by AcquireCredentialsHandleW and is
        // consumed here, so it cannot be freed twice.
        unsafe { FreeCredentialsHandle(ptr::addr_of!(handle)) }.map_err(|e| status_of(&e))
    }

    fn release_context(&mut self, context: ContextHandle) -> Result<(), SecurityStatus> {
        let raw = context.into_raw();
        if raw.is_null() {
            return Ok(());
        }
        let handle = to_sec_handle(raw);
        // SAFETY: as above, ownership of the context ends here.
        unsafe { DeleteSecurityContext(ptr::addr_of!(handle)) }.map_err(|e| status_of(&e))
    }
}
