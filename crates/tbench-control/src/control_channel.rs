use std::ffi::CString;
use std::os::raw::c_long;
use std::sync::Arc;
use std::time::Duration;

use tbench_accum::ClientCore;
use tbench_core::{Result, TbenchError};
use tracing::{error, info};

/// Reply payload size: three f64 latencies in ms, 24 bytes, matching
/// `BUFF_SIZE` in the original `msgq.h`.
const PAYLOAD_LEN: usize = 24;

pub const CMD_FINISH: c_long = 1;
pub const CMD_PUT_LAT: c_long = 2;
pub const CMD_GET_LAT: c_long = 3;

#[repr(C)]
struct RawMsg {
    mtype: c_long,
    data: [u8; PAYLOAD_LEN],
}

/// Creates (or attaches to) the persistent System V message queue keyed
/// by `ftok(path, project_id)`.
fn mq_init(path: &str, project_id: i32) -> Result<libc::c_int> {
    let cpath = CString::new(path)
        .map_err(|e| TbenchError::ControlQueue(format!("invalid queue path: {e}")))?;
    let key = unsafe { libc::ftok(cpath.as_ptr(), project_id) };
    if key == -1 {
        return Err(TbenchError::ControlQueue(
            "ftok() failed: path must exist".to_string(),
        ));
    }
    let mqid = unsafe { libc::msgget(key, libc::IPC_CREAT | 0o666) };
    if mqid == -1 {
        return Err(TbenchError::ControlQueue("msgget() failed".to_string()));
    }
    Ok(mqid)
}

fn mq_recv(mqid: libc::c_int) -> Result<(c_long, [u8; PAYLOAD_LEN])> {
    let mut msg = RawMsg {
        mtype: 0,
        data: [0u8; PAYLOAD_LEN],
    };
    let size = std::mem::size_of::<[u8; PAYLOAD_LEN]>();
    let n = unsafe {
        libc::msgrcv(
            mqid,
            &mut msg as *mut RawMsg as *mut libc::c_void,
            size,
            0,
            0,
        )
    };
    if n == -1 {
        return Err(TbenchError::ControlQueue("msgrcv() failed".to_string()));
    }
    Ok((msg.mtype, msg.data))
}

fn mq_send(mqid: libc::c_int, mtype: c_long, data: [u8; PAYLOAD_LEN]) -> Result<()> {
    let msg = RawMsg { mtype, data };
    let size = std::mem::size_of::<[u8; PAYLOAD_LEN]>();
    let rc = unsafe {
        libc::msgsnd(
            mqid,
            &msg as *const RawMsg as *const libc::c_void,
            size,
            0,
        )
    };
    if rc == -1 {
        return Err(TbenchError::ControlQueue("msgsnd() failed".to_string()));
    }
    Ok(())
}

fn encode_lats(p50: f64, p95: f64, p99: f64) -> [u8; PAYLOAD_LEN] {
    let mut buf = [0u8; PAYLOAD_LEN];
    buf[0..8].copy_from_slice(&p50.to_le_bytes());
    buf[8..16].copy_from_slice(&p95.to_le_bytes());
    buf[16..24].copy_from_slice(&p99.to_le_bytes());
    buf
}

/// Request-reply dumper policy: loops receiving a
/// message whose tag must be `CMD_GET_LAT`, polls `snapshot_percentiles`
/// every second until non-empty, replies with the three latencies
/// tagged `CMD_PUT_LAT`, then clears the accumulator. Any unexpected
/// tag or queue error is fatal.
pub fn run_control_channel_dumper(core: Arc<ClientCore>, path: &str, project_id: i32) -> Result<()> {
    let mqid = mq_init(path, project_id)?;
    info!(mqid, path, project_id, "control channel attached");

    loop {
        let (mtype, _payload) = mq_recv(mqid)?;
        if mtype != CMD_GET_LAT {
            error!(mtype, "unexpected control message tag");
            return Err(TbenchError::ControlQueue(format!(
                "unexpected tag: {mtype}"
            )));
        }

        let (p50, p95, p99) = loop {
            if let Some(lats) = core.snapshot_percentiles() {
                break lats;
            }
            std::thread::sleep(Duration::from_secs(1));
        };

        mq_send(mqid, CMD_PUT_LAT, encode_lats(p50, p95, p99))?;
        core.clear_accumulator();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_lats_round_trips() {
        let buf = encode_lats(1.5, 9.75, 20.0);
        assert_eq!(f64::from_le_bytes(buf[0..8].try_into().unwrap()), 1.5);
        assert_eq!(f64::from_le_bytes(buf[8..16].try_into().unwrap()), 9.75);
        assert_eq!(f64::from_le_bytes(buf[16..24].try_into().unwrap()), 20.0);
    }
}
