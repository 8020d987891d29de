use pinktrace::{Architecture, syscalls};

fn main() {
    println!("{} {}", pinktrace::PACKAGE, pinktrace::version());

    if let Some(head) = pinktrace::GIT_HEAD {
        println!("git head: {}", head);
    }

    for &arch in Architecture::ALL {
        let connect = syscalls::number_for_name(arch, "connect")
            .map(|nr| nr.to_string())
            .unwrap_or_else(|| "via socketcall".into());

        println!("{:>8}: word size = {}, connect = {}", arch, arch.word_size(), connect);
    }
}
