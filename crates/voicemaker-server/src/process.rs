use std::io::{self, Write};
use std::process::{Child, Command, Output, Stdio};
use std::thread;

/// Start `program` with all three standard streams piped.
pub(crate) fn spawn_piped<I, S>(program: &str, args: I) -> io::Result<Child>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
}

/// Feed `input` on stdin from a helper thread and collect the output.
///
/// Writing on a separate thread keeps a child that streams output while it
/// reads from blocking on a full pipe.
pub(crate) fn feed_and_wait(mut child: Child, input: Vec<u8>) -> io::Result<Output> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("child stdin unavailable"))?;
    let writer = thread::spawn(move || stdin.write_all(&input));
    let output = child.wait_with_output()?;
    let written = writer
        .join()
        .map_err(|_| io::Error::other("stdin writer panicked"))?;
    // A child that exits early closes its stdin; its exit status says more.
    if output.status.success() {
        written?;
    }
    Ok(output)
}
