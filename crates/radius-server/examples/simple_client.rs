//! Send one Access-Request and print the verdict
//!
//! ```text
//! cargo run --example simple_client -- alice wonderland testing123 127.0.0.1:1812
//! ```

use radius_proto::{
    auth::{encrypt_user_password, generate_request_authenticator, verify_response_authenticator},
    Attribute, AttributeType, Code, Packet,
};
use std::net::UdpSocket;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <username> <password> <secret> [server_addr]", args[0]);
        eprintln!("Example: {} alice wonderland testing123 127.0.0.1:1812", args[0]);
        std::process::exit(1);
    }

    let username = &args[1];
    let password = &args[2];
    let secret = args[3].as_bytes();
    let server_addr = args.get(4).map(|s| s.as_str()).unwrap_or("127.0.0.1:1812");

    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(server_addr)?;
    socket.set_read_timeout(Some(Duration::from_secs(5)))?;

    let request_auth = generate_request_authenticator();
    let identifier = request_auth[0];
    let mut packet = Packet::new(Code::AccessRequest, identifier, request_auth);
    packet.add_attribute(Attribute::string(AttributeType::UserName as u8, username)?);
    packet.add_attribute(Attribute::new(
        AttributeType::UserPassword as u8,
        encrypt_user_password(password, secret, &request_auth),
    )?);
    packet.add_attribute(Attribute::ipv4(AttributeType::NasIpAddress as u8, [127, 0, 0, 1])?);

    let request_data = packet.encode()?;
    println!(
        "Sending Access-Request id={} ({} bytes) to {}",
        identifier,
        request_data.len(),
        server_addr
    );
    socket.send(&request_data)?;

    let mut buffer = vec![0u8; Packet::MAX_PACKET_SIZE];
    let len = match socket.recv(&mut buffer) {
        Ok(len) => len,
        Err(e) => {
            eprintln!("No response from server: {}", e);
            return Err(e.into());
        }
    };

    let response = Packet::decode(&buffer[..len])?;
    if response.identifier != identifier {
        return Err(format!(
            "identifier mismatch: sent {}, got {}",
            identifier, response.identifier
        )
        .into());
    }
    if !verify_response_authenticator(&response, &request_auth, secret) {
        return Err("response authenticator does not verify; wrong secret?".into());
    }

    match response.code {
        Code::AccessAccept => println!("Access-Accept"),
        Code::AccessReject => println!("Access-Reject"),
        other => println!("Unexpected response: {}", other),
    }
    for attr in response.find_all_attributes(AttributeType::ReplyMessage) {
        if let Ok(msg) = attr.as_string() {
            println!("  Reply-Message: {}", msg);
        }
    }

    Ok(())
}
