//! Process signalling for the hypervisor child.

/// Send SIGTERM to a process.
///
/// # Returns
/// * `true` - Signal delivered
/// * `false` - Process does not exist or permission denied
pub fn terminate_process(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, libc::SIGTERM) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        assert!(terminate_process(child.id()));
        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_terminate_missing_process() {
        assert!(!terminate_process(999999999));
    }
}
