use clap::Parser;
use emulated_roku::{netif::HostNetwork, Config, KeyAction, Service};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Make this host discoverable and controllable as a Roku
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// The device name shown by control hubs and apps
    #[arg(long, env = "EMULATED_ROKU_DEVICE_NAME", default_value = "Emulated Roku")]
    device_name: String,

    /// The ECP HTTP port
    #[arg(long, env = "EMULATED_ROKU_PORT", default_value_t = 8060)]
    port: u16,

    /// Where to broadcast announcements
    #[arg(
        long,
        env = "EMULATED_ROKU_BROADCAST_ADDRESS",
        default_value_t = Ipv4Addr::BROADCAST
    )]
    broadcast_address: Ipv4Addr,

    /// Don't send broadcast announcements at all
    #[arg(long, env = "EMULATED_ROKU_NO_BROADCAST")]
    no_broadcast: bool,

    /// A hub to send announcements to directly
    #[arg(long, env = "EMULATED_ROKU_UNICAST_TARGET")]
    unicast_target: Option<Ipv4Addr>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            device_name: args.device_name,
            port: args.port,
            broadcast_address: (!args.no_broadcast)
                .then_some(args.broadcast_address),
            unicast_target: args.unicast_target,
            ..Default::default()
        }
    }
}

static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_: nix::libc::c_int) {
    STOP.store(true, Ordering::Relaxed);
}

fn install_signal_handlers() -> nix::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
    let action =
        SigAction::new(SigHandler::Handler(on_signal), SaFlags::empty(), SigSet::empty());
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let config = Config::from(Args::parse());
    install_signal_handlers()?;

    let mut poll = mio::Poll::new()?;
    let mut events = mio::Events::with_capacity(64);
    let mut service = Service::new(config, HostNetwork, roku_ssdp::MioBinder);
    service.subscribe(Box::new(|action: KeyAction, key: &str| {
        println!("{action} {key}");
    }));

    while !STOP.load(Ordering::Relaxed) {
        service.poll_cycle(Instant::now());
        service.register(poll.registry())?;

        let timeout = service.next_wakeup(Instant::now());
        if let Err(e) = poll.poll(&mut events, Some(timeout)) {
            if e.kind() != std::io::ErrorKind::Interrupted {
                return Err(e.into());
            }
        }
    }

    log::info!("Shutting down");
    service.shutdown();
    Ok(())
}
