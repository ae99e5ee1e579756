/// Console and file collaborators the interpreter calls out to. The core
/// never touches stdio or the filesystem directly; embedders supply an
/// implementation (`basil-cli` ships the stdio one, tests use a scripted
/// one).
pub trait Host {
    /// Write one line to the console.
    fn print(&mut self, text: &str);

    /// Blocking line read, without the trailing newline.
    fn read_line(&mut self) -> String;

    /// Blocking integer read; re-prompts until the input parses.
    fn read_int(&mut self) -> i64;

    /// Clear the console.
    fn clear(&mut self);

    /// Read a whole file; the handle does not outlive the call. A failed
    /// read is reported as text and becomes a recoverable runtime error.
    fn read_file(&mut self, path: &str) -> Result<String, String>;
}
