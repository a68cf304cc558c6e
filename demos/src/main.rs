use std::env;
use std::net::TcpStream;
use std::process;
use std::thread;
use std::time::Duration;

use getopts::Options;
use log::info;

use mqtt3::QoS;
use mqttc::{ClientConfig, Session};
use netopt::NetworkStream;

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] HOST:PORT", program);
    print!("{}", opts.usage(&brief));
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "client-id", "client id (random if omitted)", "ID");
    opts.optopt("u", "username", "broker username", "USER");
    opts.optopt("p", "password", "broker password", "PASS");
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    if matches.opt_present("h") || matches.free.is_empty() {
        print_usage(&program, &opts);
        process::exit(if matches.opt_present("h") { 0 } else { 1 });
    }

    let addr = matches.free[0].clone();

    let mut config = ClientConfig::new();
    match matches.opt_str("i") {
        Some(id) => {
            config.set_client_id(id);
        }
        None => {
            config.generate_client_id();
        }
    }
    if let Some(username) = matches.opt_str("u") {
        config.set_username(username);
    }
    if let Some(password) = matches.opt_str("p") {
        config.set_password(password);
    }
    config.set_keep_alive(30);

    info!("connecting to {}", addr);
    let stream = TcpStream::connect(&addr).unwrap_or_else(|e| {
        eprintln!("connect {} failed: {}", addr, e);
        process::exit(2);
    });
    let transport = NetworkStream::Tcp(stream);

    let session = std::sync::Arc::new(Session::new(transport, config));
    session.set_on_publish(|topic, payload| {
        println!("\"{}\" delivered {}B\n{}", topic, payload.len(), String::from_utf8_lossy(payload));
    });

    let pump_session = std::sync::Arc::clone(&session);
    let pump = thread::spawn(move || loop {
        match pump_session.pump() {
            Ok(n) if n > 0 => continue,
            Ok(_) => {
                info!("connection closed");
                break;
            }
            Err(e) => {
                eprintln!("pump error: {}", e);
                break;
            }
        }
    });

    match session.connect() {
        Ok(()) => println!("mqtt connect successful"),
        Err(e) => {
            eprintln!("mqtt connect {}", e);
            process::exit(3);
        }
    }

    println!("mqtt subscribe {:?}", session.subscribe("test/topic", QoS::AtMostOnce));
    println!("mqtt unsubscribe {:?}", session.unsubscribe("test/topic"));
    println!("mqtt subscribe {:?}", session.subscribe("test/topic", QoS::ExactlyOnce));

    println!("mqtt publish0 {:?}", session.publish("tp/aa", b"publish qos = 0", QoS::AtMostOnce, false));
    println!("mqtt publish1 {:?}", session.publish("tp/aa", b"publish qos = 1", QoS::AtLeastOnce, false));
    println!("mqtt publish2 {:?}", session.publish("tp/aa", b"publish qos = 2", QoS::ExactlyOnce, false));

    loop {
        thread::sleep(Duration::from_secs(30));
        info!("timeout, sending ping");
        if session.ping().is_err() {
            break;
        }
    }

    let _ = pump.join();
}
